//! The replacement-policy list: every header the pool owns, valid or
//! `INVALID`, threaded through `repl_prev`/`repl_next`. Head is freshest,
//! tail is the next eviction candidate; `INVALID` headers always sit at
//! the tail.

use crate::{config::ReplacementPolicyKind, header::HeaderHandle, pool::HeaderPool};

pub(crate) struct ReplacementList {
	policy: ReplacementPolicyKind,
	head: Option<HeaderHandle>,
	tail: Option<HeaderHandle>,
	len: usize,
}

impl ReplacementList {
	pub fn new(policy: ReplacementPolicyKind) -> Self {
		Self {
			policy,
			head: None,
			tail: None,
			len: 0,
		}
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.len
	}

	#[inline]
	pub fn tail(&self) -> Option<HeaderHandle> {
		self.tail
	}

	#[inline]
	pub fn head(&self) -> Option<HeaderHandle> {
		self.head
	}

	/// Links a header not currently on the list at the head. Used both for
	/// brand-new headers and for a recycled header after eviction.
	pub fn prepend(&mut self, pool: &mut HeaderPool, handle: HeaderHandle) {
		let old_head = self.head;
		{
			let header = pool.get_mut(handle);
			debug_assert!(header.repl_prev.is_none() && header.repl_next.is_none());
			header.repl_prev = None;
			header.repl_next = old_head;
		}
		if let Some(old_head) = old_head {
			pool.get_mut(old_head).repl_prev = Some(handle);
		}
		self.head = Some(handle);
		if self.tail.is_none() {
			self.tail = Some(handle);
		}
		self.len += 1;
	}

	/// Fully detaches `handle` from the list. Leaves its own links null;
	/// the caller is responsible for re-linking it elsewhere (or it is
	/// about to be handed back to the loader for reuse).
	pub fn remove(&mut self, pool: &mut HeaderPool, handle: HeaderHandle) {
		let (prev, next) = {
			let header = pool.get(handle);
			(header.repl_prev, header.repl_next)
		};
		match prev {
			Some(prev) => pool.get_mut(prev).repl_next = next,
			None => self.head = next,
		}
		match next {
			Some(next) => pool.get_mut(next).repl_prev = prev,
			None => self.tail = prev,
		}
		let header = pool.get_mut(handle);
		header.repl_prev = None;
		header.repl_next = None;
		self.len -= 1;
	}

	/// Moves `handle` to the head, unconditionally. Used by `LRU::touch`
	/// and is also how a resident header is promoted after a successful
	/// access under that policy.
	pub fn move_to_front(&mut self, pool: &mut HeaderPool, handle: HeaderHandle) {
		if self.head == Some(handle) {
			return;
		}
		self.remove(pool, handle);
		self.prepend(pool, handle);
	}

	/// Moves `handle` to the tail, unconditionally - the invalidation
	/// placement rule, independent of policy.
	pub fn move_to_tail(&mut self, pool: &mut HeaderPool, handle: HeaderHandle) {
		if self.tail == Some(handle) {
			return;
		}
		self.remove(pool, handle);
		let old_tail = self.tail;
		{
			let header = pool.get_mut(handle);
			header.repl_next = None;
			header.repl_prev = old_tail;
		}
		if let Some(old_tail) = old_tail {
			pool.get_mut(old_tail).repl_next = Some(handle);
		}
		self.tail = Some(handle);
		if self.head.is_none() {
			self.head = Some(handle);
		}
		self.len += 1;
	}

	/// The per-policy access hook: `LRU` promotes to head, `FIFO` is a
	/// no-op.
	pub fn touch(&mut self, pool: &mut HeaderPool, handle: HeaderHandle) {
		match self.policy {
			ReplacementPolicyKind::Lru => self.move_to_front(pool, handle),
			ReplacementPolicyKind::Fifo => {}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn pool_with(n: usize) -> (HeaderPool, Vec<HeaderHandle>) {
		let mut pool = HeaderPool::new(16);
		let handles = (0..n).map(|i| pool.allocate(i as u64 * 16, 0, 0)).collect();
		(pool, handles)
	}

	#[test]
	fn prepend_builds_head_to_tail_order() {
		let (mut pool, handles) = pool_with(3);
		let mut list = ReplacementList::new(ReplacementPolicyKind::Lru);
		for h in &handles {
			list.prepend(&mut pool, *h);
		}
		assert_eq!(list.len(), 3);
		assert_eq!(list.head(), Some(handles[2]));
		assert_eq!(list.tail(), Some(handles[0]));
	}

	#[test]
	fn lru_touch_promotes_to_head() {
		let (mut pool, handles) = pool_with(3);
		let mut list = ReplacementList::new(ReplacementPolicyKind::Lru);
		for h in &handles {
			list.prepend(&mut pool, *h);
		}
		// order head->tail: h2, h1, h0
		list.touch(&mut pool, handles[0]);
		assert_eq!(list.head(), Some(handles[0]));
		assert_eq!(list.tail(), Some(handles[1]));
	}

	#[test]
	fn fifo_touch_is_noop() {
		let (mut pool, handles) = pool_with(3);
		let mut list = ReplacementList::new(ReplacementPolicyKind::Fifo);
		for h in &handles {
			list.prepend(&mut pool, *h);
		}
		list.touch(&mut pool, handles[0]);
		assert_eq!(list.head(), Some(handles[2]));
		assert_eq!(list.tail(), Some(handles[0]));
	}

	#[test]
	fn move_to_tail_places_at_tail_regardless_of_policy() {
		let (mut pool, handles) = pool_with(3);
		let mut list = ReplacementList::new(ReplacementPolicyKind::Fifo);
		for h in &handles {
			list.prepend(&mut pool, *h);
		}
		list.move_to_tail(&mut pool, handles[2]);
		assert_eq!(list.tail(), Some(handles[2]));
		assert_eq!(list.len(), 3);
	}

	#[test]
	fn remove_shrinks_list_and_fixes_links() {
		let (mut pool, handles) = pool_with(3);
		let mut list = ReplacementList::new(ReplacementPolicyKind::Lru);
		for h in &handles {
			list.prepend(&mut pool, *h);
		}
		list.remove(&mut pool, handles[1]);
		assert_eq!(list.len(), 2);
		assert_eq!(pool.get(handles[2]).repl_next, Some(handles[0]));
		assert_eq!(pool.get(handles[0]).repl_prev, Some(handles[2]));
	}
}
