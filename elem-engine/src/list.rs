use super::engine::Engine;
use super::error::EResult;
use super::seq::{resolve_index, resolve_insertion};
use super::val::{Data, Kind, Val};
use smallvec::SmallVec;
use std::cell::Cell;
use tracing::trace;

/*

cons lists are stored as doubly-linked chains of nodes in an engine-wide arena. a list value is
just a header which names its first node, so that list_cdr can share the rest of the chain in
O(1): the new header points at the second node, and that node's count goes up by one.

a node's count is the number of incoming references: the headers whose first node it is, plus
the `next` links which point at it. `prev` links are unowned hints, used by reversal and by
backward cursors; they're validated before use.

chains may be cyclic. the last node of a cyclic chain points back at an earlier node (the
"entry"). we detect this without any per-node allocation: each traversal takes a fresh stamp from
the arena's generation counter, and stops as soon as it reaches a node which already carries
that stamp. marks live in Cells, so read-only traversals only need `&Engine`.

when a reference to a node is dropped, we destroy nodes along `next` while their counts reach
zero. if that leaves a surviving node with a count of one, we walk forward from it once: when
every node on the walk has a count of one and the walk returns to its start, the chain is a
cycle which nothing outside it refers to, and the whole cycle is destroyed.

*/

//-------------------------------------------------------------------------------------------------
// NodeArena
//-------------------------------------------------------------------------------------------------

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u32);

struct Node {
	value: Val,
	next: Option<NodeId>,
	prev: Option<NodeId>,
	count: u32,
	mark: Cell<u32>,
	live: bool
}

pub(crate) struct NodeArena {
	nodes: Vec<Node>,
	vacant: Vec<u32>,
	generation: Cell<u32>
}

//the nodes of a chain, in order, each visited once
pub(crate) struct Chain {
	pub(crate) nodes: SmallVec<[NodeId; 16]>,

	//the index of the node which the last node links back to
	pub(crate) cycle: Option<usize>,

	stamp: u32
}

impl Chain {
	pub(crate) fn len(&self) -> usize {
		self.nodes.len()
	}

	fn last(&self) -> Option<NodeId> {
		self.nodes.last().copied()
	}
}

impl NodeArena {
	pub(crate) fn with_capacity(capacity: usize) -> NodeArena {
		NodeArena {
			nodes: Vec::with_capacity(capacity),
			vacant: Vec::new(),
			generation: Cell::new(0)
		}
	}

	pub(crate) fn census(&self) -> (usize, usize) {
		(self.nodes.len() - self.vacant.len(), self.vacant.len())
	}

	#[inline]
	fn node(&self, id: NodeId) -> &Node {
		let node = &self.nodes[id.0 as usize];
		assert!(node.live, "attempted to access a reclaimed list node");
		node
	}

	#[inline]
	fn node_mut(&mut self, id: NodeId) -> &mut Node {
		let node = &mut self.nodes[id.0 as usize];
		assert!(node.live, "attempted to access a reclaimed list node");
		node
	}

	pub(crate) fn value(&self, id: NodeId) -> Val {
		self.node(id).value
	}

	fn next(&self, id: NodeId) -> Option<NodeId> {
		self.node(id).next
	}

	fn valid_prev(&self, id: NodeId) -> Option<NodeId> {
		self.node(id).prev.filter(|&prev| self.node(prev).next == Some(id))
	}

	fn alloc(&mut self, value: Val) -> NodeId {
		let node = Node {
			value,
			next: None,
			prev: None,
			count: 0,
			mark: Cell::new(0),
			live: true
		};

		match self.vacant.pop() {
			Some(index) => {
				self.nodes[index as usize] = node;
				NodeId(index)
			}
			None => {
				assert!(self.nodes.len() < u32::MAX as usize, "node arena exhausted");
				self.nodes.push(node);
				NodeId((self.nodes.len() - 1) as u32)
			}
		}
	}

	fn free(&mut self, id: NodeId) {
		let next = self.node(id).next;
		if let Some(next) = next {
			if self.nodes[next.0 as usize].prev == Some(id) {
				self.nodes[next.0 as usize].prev = None;
			}
		}

		let node = self.node_mut(id);
		node.live = false;
		node.next = None;
		node.prev = None;
		node.count = 0;
		self.vacant.push(id.0);
	}

	fn add_ref(&mut self, id: NodeId) {
		self.node_mut(id).count += 1;
	}

	//a -> b, where b gains an owner
	fn link(&mut self, a: NodeId, b: NodeId) {
		self.node_mut(a).next = Some(b);
		let b = self.node_mut(b);
		b.prev = Some(a);
		b.count += 1;
	}

	//---------------------------------------------------------------------------------------------
	// generation marks
	//---------------------------------------------------------------------------------------------

	fn fresh_stamp(&self) -> u32 {
		let mut generation = self.generation.get().wrapping_add(1);
		if generation == 0 {
			for node in &self.nodes {
				node.mark.set(0);
			}
			generation = 1;
		}

		self.generation.set(generation);
		generation
	}

	fn is_marked(&self, id: NodeId, stamp: u32) -> bool {
		self.node(id).mark.get() == stamp
	}

	fn mark(&self, id: NodeId, stamp: u32) {
		self.node(id).mark.set(stamp)
	}

	pub(crate) fn chain(&self, first: Option<NodeId>) -> Chain {
		let stamp = self.fresh_stamp();
		let mut nodes = SmallVec::new();
		let mut cycle = None;

		let mut current = first;
		while let Some(id) = current {
			if self.is_marked(id, stamp) {
				cycle = nodes.iter().position(|&node| node == id);
				break
			}

			self.mark(id, stamp);
			nodes.push(id);
			current = self.next(id);
		}

		Chain { nodes, cycle, stamp }
	}

	//---------------------------------------------------------------------------------------------
	// reclamation
	//---------------------------------------------------------------------------------------------

	//drops one reference to `start`, pushing the value of each destroyed node onto `released`
	pub(crate) fn drop_ref(&mut self, start: NodeId, released: &mut Vec<Val>) {
		let mut current = Some(start);
		while let Some(id) = current {
			let node = self.node_mut(id);
			debug_assert!(node.count > 0);
			node.count -= 1;

			if node.count > 0 {
				if node.count == 1 {
					self.destroy_if_orphan_cycle(id, released);
				}
				return
			}

			current = node.next;
			released.push(node.value);
			self.free(id);
		}
	}

	fn destroy_if_orphan_cycle(&mut self, start: NodeId, released: &mut Vec<Val>) {
		let stamp = self.fresh_stamp();
		self.mark(start, stamp);

		let mut members: SmallVec<[NodeId; 16]> = SmallVec::new();
		members.push(start);

		let mut current = start;
		loop {
			let node = self.node(current);
			if node.count != 1 {
				return
			}

			match node.next {
				None => return,
				Some(next) if next == start => break,
				Some(next) => {
					if self.is_marked(next, stamp) {
						return
					}

					self.mark(next, stamp);
					members.push(next);
					current = next;
				}
			}
		}

		trace!(nodes = members.len(), "destroying an unreachable list cycle");

		for &id in &members {
			released.push(self.node(id).value);
		}
		for &id in &members {
			self.free(id);
		}
	}

	#[cfg(test)]
	fn set_generation(&self, generation: u32) {
		self.generation.set(generation)
	}
}

//-------------------------------------------------------------------------------------------------
// ListCursor
//-------------------------------------------------------------------------------------------------

/**
A position within a cons list.

Created by [`Engine::list_begin`](struct.Engine.html#method.list_begin) or
[`Engine::list_last`](struct.Engine.html#method.list_last). Each cursor stamps the nodes it
visits, and it stops rather than revisiting a node, so walking a cyclic list terminates after
each node has been seen once.

A cursor doesn't own its node: structural edits to the list invalidate it.
*/

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ListCursor {
	node: NodeId,
	stamp: u32,
	steps: usize
}

//-------------------------------------------------------------------------------------------------
// Engine operations
//-------------------------------------------------------------------------------------------------

impl Engine {
	pub(crate) fn list_first(&self, list: Val) -> EResult<Option<NodeId>> {
		match self.heap.data(list) {
			Data::List(first) => Ok(*first),
			data => bail!(TypeMismatch, "expected a list, received {}", data.kind().a_type_name())
		}
	}

	fn set_list_first(&mut self, list: Val, first: Option<NodeId>) {
		if let Data::List(slot) = self.heap.data_mut(list) {
			*slot = first;
		}
	}

	pub(crate) fn list_chain(&self, list: Val) -> EResult<Chain> {
		Ok(self.nodes.chain(self.list_first(list)?))
	}

	//fills an empty header with a fresh chain holding `items`. when `cycle` is given, the last
	//node links back to the node at that index.
	pub(crate) fn attach_chain(&mut self, list: Val, items: &[Val], cycle: Option<usize>) {
		let mut ids: SmallVec<[NodeId; 16]> = SmallVec::with_capacity(items.len());
		for &item in items {
			self.increment(item);
			ids.push(self.nodes.alloc(item));
		}

		for pair in ids.windows(2) {
			self.nodes.link(pair[0], pair[1]);
		}

		if let Some(&first) = ids.first() {
			self.nodes.add_ref(first);
		}

		if let (Some(entry), Some(&last)) = (cycle, ids.last()) {
			let entry = ids[entry];
			self.nodes.node_mut(last).next = Some(entry);
			self.nodes.add_ref(entry);
		}

		self.set_list_first(list, ids.first().copied());
	}

	///Makes a pooled cons list holding `items`, which are each incremented.
	pub fn provide_list(&mut self, items: &[Val]) -> Val {
		let list = self.heap.provide(Kind::List, |_| ());
		self.attach_chain(list, items, None);
		list
	}

	pub fn new_list(&mut self, items: &[Val]) -> Val {
		let list = self.heap.alloc(Data::List(None), super::gc::Origin::Plain);
		self.attach_chain(list, items, None);
		list
	}

	///The values of a cons list, in order. Each node of a cyclic list is visited once.
	pub fn list_values(&self, list: Val) -> EResult<Vec<Val>> {
		let chain = self.list_chain(list)?;
		Ok(chain.nodes.iter().map(|&id| self.nodes.value(id)).collect())
	}

	///The number of distinct nodes in a cons list.
	pub fn list_len(&self, list: Val) -> EResult<usize> {
		Ok(self.list_chain(list)?.len())
	}

	pub fn list_is_cyclic(&self, list: Val) -> EResult<bool> {
		Ok(self.list_chain(list)?.cycle.is_some())
	}

	///The index of the node which a cyclic list's last node links back to.
	pub fn list_cycle_entry(&self, list: Val) -> EResult<Option<usize>> {
		Ok(self.list_chain(list)?.cycle)
	}

	///The first value of a cons list, or nil when it's empty.
	pub fn list_car(&self, list: Val) -> EResult<Val> {
		Ok(match self.list_first(list)? {
			Some(first) => self.nodes.value(first),
			None => self.nil()
		})
	}

	/**
	Returns a new list header which shares every node of `list` except the first. This is O(1).

	Returns nil when `list` is empty, or is a single node without a cycle. A one-node cycle is its
	own successor, so its cdr is a new header on that same node.
	*/
	pub fn list_cdr(&mut self, list: Val) -> EResult<Val> {
		let second = match self.list_first(list)? {
			Some(first) => self.nodes.next(first),
			None => None
		};

		match second {
			Some(second) => {
				let cdr = self.heap.provide(Kind::List, |_| ());
				self.nodes.add_ref(second);
				self.set_list_first(cdr, Some(second));
				Ok(cdr)
			}
			None => Ok(self.nil())
		}
	}

	pub fn list_at(&self, list: Val, i: i64) -> EResult<Val> {
		let chain = self.list_chain(list)?;
		let index = resolve_index(i, chain.len())?;
		Ok(self.nodes.value(chain.nodes[index]))
	}

	///Replaces the value at index `i`. Returns the list which was actually mutated, which is a
	///copy when `list` is shared.
	pub fn list_set(&mut self, list: Val, i: i64, val: Val) -> EResult<Val> {
		let list = self.duplicate_if_shared(list);
		let chain = self.list_chain(list)?;
		let node = chain.nodes[resolve_index(i, chain.len())?];

		self.increment(val);
		let old = std::mem::replace(&mut self.nodes.node_mut(node).value, val);
		self.decrement(old);

		Ok(list)
	}

	pub fn list_push_front(&mut self, list: Val, val: Val) -> EResult<Val> {
		let list = self.duplicate_if_shared(list);
		self.insert_node(list, 0, val)?;
		Ok(list)
	}

	///Appends a value. On a cyclic list, the new node is placed before the back edge, so that
	///the cycle stays closed.
	pub fn list_push_back(&mut self, list: Val, val: Val) -> EResult<Val> {
		let list = self.duplicate_if_shared(list);
		self.insert_node(list, -1, val)?;
		Ok(list)
	}

	///Inserts a value so that it ends up at index `i`. `-1` appends.
	pub fn list_insert(&mut self, list: Val, i: i64, val: Val) -> EResult<Val> {
		let list = self.duplicate_if_shared(list);
		self.insert_node(list, i, val)?;
		Ok(list)
	}

	fn insert_node(&mut self, list: Val, i: i64, val: Val) -> EResult<()> {
		let chain = self.list_chain(list)?;
		let index = resolve_insertion(i, chain.len())?;

		self.increment(val);
		let node = self.nodes.alloc(val);

		if index == 0 {
			//the header's reference to the old first node moves to the new node
			let first = self.list_first(list)?;
			self.nodes.node_mut(node).next = first;
			self.nodes.add_ref(node);
			if let Some(first) = first {
				if self.nodes.node(first).prev.is_none() {
					self.nodes.node_mut(first).prev = Some(node);
				}
			}
			self.set_list_first(list, Some(node));
		} else {
			//likewise for the predecessor's link, which may be a cycle's back edge
			let pred = chain.nodes[index - 1];
			let succ = self.nodes.next(pred);
			self.nodes.link(pred, node);
			self.nodes.node_mut(node).next = succ;
			if let Some(succ) = succ {
				if self.nodes.node(succ).prev == Some(pred) {
					self.nodes.node_mut(succ).prev = Some(node);
				}
			}
		}

		Ok(())
	}

	/**
	Removes the node at index `i`.

	When the removed node is a cycle's entry, the back edge moves to the following node. Removing
	the only node leaves the list empty.
	*/
	pub fn list_remove_at(&mut self, list: Val, i: i64) -> EResult<Val> {
		let list = self.duplicate_if_shared(list);
		let chain = self.list_chain(list)?;
		let index = resolve_index(i, chain.len())?;
		let target = chain.nodes[index];

		if self.nodes.next(target) == Some(target) {
			self.nodes.node_mut(target).next = None;
			self.nodes.node_mut(target).count -= 1;
		} else if chain.cycle == Some(index) {
			if let Some(last) = chain.last() {
				let new_entry = chain.nodes.get(index + 1).copied();
				self.nodes.node_mut(last).next = new_entry;
				if let Some(new_entry) = new_entry {
					self.nodes.add_ref(new_entry);
				}
				self.nodes.node_mut(target).count -= 1;
			}
		}

		let pred = if index > 0 { Some(chain.nodes[index - 1]) } else { None };
		let succ = self.nodes.next(target);
		match pred {
			Some(pred) => self.nodes.node_mut(pred).next = succ,
			None => self.set_list_first(list, succ)
		}

		if let Some(succ) = succ {
			self.nodes.add_ref(succ);
			if self.nodes.node(succ).prev == Some(target) {
				self.nodes.node_mut(succ).prev = pred;
			}
		}

		self.release_node(target);
		Ok(list)
	}

	fn release_node(&mut self, node: NodeId) {
		let mut released = Vec::new();
		self.nodes.drop_ref(node, &mut released);
		for val in released {
			self.decrement(val);
		}
	}

	/**
	Links the last node of `list` back to the node at index `i`, making the list cyclic. If the
	list was already cyclic, its old back edge is replaced.

	This edits the chain in place, so it's visible through every list which shares that chain.
	*/
	pub fn list_link_tail(&mut self, list: Val, i: i64) -> EResult<()> {
		let chain = self.list_chain(list)?;
		let target = chain.nodes[resolve_index(i, chain.len())?];

		if let Some(last) = chain.last() {
			if let Some(old) = self.nodes.next(last) {
				self.nodes.node_mut(last).next = None;
				self.release_node(old);
			}

			self.nodes.node_mut(last).next = Some(target);
			self.nodes.add_ref(target);
		}

		Ok(())
	}

	/**
	Splices the chain of `b` onto the end of `a`.

	This is O(1) once `a`'s last node has been located: `b`'s nodes are shared rather than
	copied. When `a` is cyclic, `b`'s values are copied in before its back edge instead.
	`list_concat(a, a)` closes a cycle.
	*/
	pub fn list_concat(&mut self, a: Val, b: Val) -> EResult<Val> {
		let a = self.duplicate_if_shared(a);
		let b_first = match self.list_first(b)? {
			Some(b_first) => b_first,
			None => return Ok(a)
		};

		let chain = self.list_chain(a)?;
		if chain.cycle.is_some() {
			for val in self.list_values(b)? {
				self.insert_node(a, -1, val)?;
			}
		} else if let Some(last) = chain.last() {
			self.nodes.node_mut(last).next = Some(b_first);
			self.nodes.add_ref(b_first);
			if self.nodes.node(b_first).prev.is_none() {
				self.nodes.node_mut(b_first).prev = Some(last);
			}
		} else {
			self.nodes.add_ref(b_first);
			self.set_list_first(a, Some(b_first));
		}

		Ok(a)
	}

	/**
	Reverses a cons list.

	With `duplicate`, the result is a reversed copy and `list` is untouched. Otherwise the chain
	is reversed in place; when `list` is the tail of another list, that list's link into it is
	moved to the new first node. A cycle is re-attached at the mirrored position.
	*/
	pub fn list_reverse(&mut self, list: Val, duplicate: bool) -> EResult<Val> {
		if duplicate {
			let copy = self.copying(list, true);
			self.reverse_chain(copy)?;
			Ok(copy)
		} else {
			self.reverse_chain(list)?;
			Ok(list)
		}
	}

	fn reverse_chain(&mut self, list: Val) -> EResult<()> {
		let chain = self.list_chain(list)?;
		let len = chain.len();
		if len < 2 {
			return Ok(())
		}

		let old_first = chain.nodes[0];
		let old_last = chain.nodes[len - 1];
		let outside = self.nodes.valid_prev(old_first).filter(|&prev| {
			!self.nodes.is_marked(prev, chain.stamp)
		});

		if let Some(entry) = chain.cycle {
			trace!(entry, len, "detaching a cycle for reversal");
			self.nodes.node_mut(old_last).next = None;
			self.nodes.node_mut(chain.nodes[entry]).count -= 1;
		}

		//every node keeps its count: each gains the link it used to give, and the header moves
		//from the first node to the last
		for (i, &id) in chain.nodes.iter().enumerate() {
			let node = self.nodes.node_mut(id);
			node.next = if i > 0 { Some(chain.nodes[i - 1]) } else { None };
			node.prev = if i + 1 < len { Some(chain.nodes[i + 1]) } else { outside };
		}
		self.set_list_first(list, Some(old_last));

		if let Some(outside) = outside {
			self.nodes.node_mut(outside).next = Some(old_last);
			self.nodes.node_mut(old_first).count -= 1;
			self.nodes.add_ref(old_last);
		}

		if let Some(entry) = chain.cycle {
			let mirrored = chain.nodes[len - 1 - entry];
			self.nodes.node_mut(old_first).next = Some(mirrored);
			self.nodes.add_ref(mirrored);
		}

		Ok(())
	}

	//used by sorting, which permutes values between the nodes of a chain
	pub(crate) fn write_chain_values(&mut self, chain: &Chain, values: &[Val]) {
		for (&id, &val) in chain.nodes.iter().zip(values) {
			self.nodes.node_mut(id).value = val;
		}
	}

	//---------------------------------------------------------------------------------------------
	// cursors
	//---------------------------------------------------------------------------------------------

	pub fn list_begin(&self, list: Val) -> EResult<Option<ListCursor>> {
		Ok(self.list_first(list)?.map(|node| self.cursor_at(node)))
	}

	///Returns a cursor at the last node, for walking a list backward.
	pub fn list_last(&self, list: Val) -> EResult<Option<ListCursor>> {
		let chain = self.list_chain(list)?;
		Ok(chain.last().map(|node| self.cursor_at(node)))
	}

	fn cursor_at(&self, node: NodeId) -> ListCursor {
		let stamp = self.nodes.fresh_stamp();
		self.nodes.mark(node, stamp);
		ListCursor { node, stamp, steps: 0 }
	}

	pub fn cursor_value(&self, cursor: &ListCursor) -> Val {
		self.nodes.value(cursor.node)
	}

	///Advances to the next node. Returns `false`, leaving the cursor where it was, at the end of
	///the list or when the next node has already been visited.
	pub fn cursor_next(&self, cursor: &mut ListCursor) -> bool {
		let next = self.nodes.next(cursor.node);
		self.step(cursor, next)
	}

	pub fn cursor_previous(&self, cursor: &mut ListCursor) -> bool {
		let prev = self.nodes.valid_prev(cursor.node);
		self.step(cursor, prev)
	}

	fn step(&self, cursor: &mut ListCursor, to: Option<NodeId>) -> bool {
		//the step limit bounds the walk even when other traversals have overwritten our marks
		match to {
			Some(node) if !self.nodes.is_marked(node, cursor.stamp) &&
			              cursor.steps < self.nodes.nodes.len() => {
				self.nodes.mark(node, cursor.stamp);
				cursor.node = node;
				cursor.steps += 1;
				true
			}
			_ => false
		}
	}
}
