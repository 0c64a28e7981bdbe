use super::assoc::Key;
use super::collections::Element;
use super::engine::Engine;
use super::gc::Origin;
use super::val::{Data, Kind, Val};
use fnv::FnvHashMap;
use tracing::trace;

/*

there are three ways to copy a container, which differ only in which sub-objects they copy:

	- copying(v, force) copies v when it's shared (or when force is set), and then descends into
	  its elements in the same way. this is the copy-on-write step: a container which some other
	  owner can see is copied before it's mutated, while a uniquely-owned element can safely be
	  shared between the original and the copy.
	- fullcopy(v) copies every container it can reach.
	- copyatom(v, threshold) copies every container whose share count is at least `threshold`.

leaves are immutable, so they're never copied. all three keep a map from each original container
to its copy: a reference to a container which has already been copied (including a reference
back to one of its ancestors) resolves to the existing copy, so sharing and cycles survive.

transfer() is a deep copy into a different engine. every object it makes is plainly allocated,
and atoms are re-interned in the destination.

*/

#[derive(Copy, Clone, Debug)]
enum Policy {
	Shared,
	Full,
	Threshold(u16)
}

impl Engine {
	///Returns `val` when it's a leaf or uniquely owned. Otherwise returns a copy made by
	///[`copying`](#method.copying), which is a temporary.
	pub fn duplicate_if_shared(&mut self, val: Val) -> Val {
		if self.is_container(val) && self.is_shared(val) {
			self.copying(val, true)
		} else {
			val
		}
	}

	/**
	Copies `val` if it's shared or if `force` is set; otherwise returns `val` unchanged.

	A copied container's elements are themselves passed through `copying(element, false)`.
	*/
	pub fn copying(&mut self, val: Val, force: bool) -> Val {
		self.copy_tree(val, Policy::Shared, force)
	}

	///Copies every container reachable from `val`. Sharing and cycles are reproduced in the
	///copy.
	pub fn fullcopy(&mut self, val: Val) -> Val {
		self.copy_tree(val, Policy::Full, true)
	}

	/**
	Copies every container reachable from `val` whose share count is at least `threshold`.
	Protected and constant containers always count as being above the threshold. A container
	below the threshold is reused as it stands, without looking at its elements.

	When the result isn't `val` itself, `val` is released, so a temporary original is reclaimed.
	*/
	pub fn copyatom(&mut self, val: Val, threshold: u16) -> Val {
		let copy = self.copy_tree(val, Policy::Threshold(threshold), false);
		if copy != val {
			self.release(val);
		}
		copy
	}

	fn needs_copy(&self, val: Val, policy: Policy, force: bool) -> bool {
		force || match policy {
			Policy::Shared => self.is_shared(val),
			Policy::Full => true,
			Policy::Threshold(threshold) => self.status(val).count().map_or(true, |n| n >= threshold)
		}
	}

	//copies in two passes over an explicit stack: first every container which needs copying is
	//given an empty copy, then each copy is filled with its original's elements, mapped through
	//the memo. neither pass recurses, so nesting depth is only limited by memory.
	fn copy_tree(&mut self, root: Val, policy: Policy, force: bool) -> Val {
		let mut memo = FnvHashMap::<Val, Val>::default();
		let mut order = Vec::new();
		let mut stack = vec![(root, force)];
		let mut children = Vec::new();

		while let Some((val, force)) = stack.pop() {
			let kind = self.kind(val);
			if kind.is_leaf() || memo.contains_key(&val) || !self.needs_copy(val, policy, force) {
				continue
			}

			let copy = self.heap.provide(kind, |_| ());
			memo.insert(val, copy);
			order.push(val);

			self.children_of(val, &mut children);
			stack.extend(children.drain(..).map(|child| (child, false)));
		}

		for &val in &order {
			let copy = memo[&val];
			let mapped = |item: Val| memo.get(&item).copied().unwrap_or(item);

			match self.kind(val) {
				Kind::Values => {
					let copied: Vec<Val> = match Val::slot(self.heap.data(val)) {
						Some(items) => items.iter().map(|&item| mapped(item)).collect(),
						None => Vec::new()
					};

					for &item in &copied {
						self.increment(item);
					}

					if let Some(slot) = Val::slot_mut(self.heap.data_mut(copy)) {
						*slot = copied;
					}
				}
				Kind::List => {
					let first = match self.heap.data(val) {
						Data::List(first) => *first,
						_ => None
					};

					let chain = self.nodes.chain(first);
					let copied: Vec<Val> = chain.nodes.iter().map(|&id| mapped(self.nodes.value(id))).collect();

					if chain.cycle.is_some() {
						trace!(len = chain.len(), entry = ?chain.cycle, "reproducing a cyclic list");
					}

					self.attach_chain(copy, &copied, chain.cycle);
				}
				Kind::DictStr | Kind::DictNum | Kind::DictInt | Kind::Set => {
					for (key, item) in self.table_entries(val) {
						let item = mapped(item);
						self.increment(item);
						if let Some(table) = self.heap.data_mut(copy).table_mut() {
							table.insert(key, item);
						}
					}
				}
				kind => with_element!(kind, T => {
					let items = T::slot(self.heap.data(val)).cloned().unwrap_or_default();
					if let Some(slot) = T::slot_mut(self.heap.data_mut(copy)) {
						*slot = items;
					}
				}, _ => ())
			}
		}

		memo.get(&root).copied().unwrap_or(root)
	}

	fn table_entries(&self, val: Val) -> Vec<(Key, Val)> {
		match self.heap.data(val).table() {
			Some(table) => table.iter().map(|(key, &item)| (key.clone(), item)).collect(),
			None => Vec::new()
		}
	}

	//---------------------------------------------------------------------------------------------
	// transfer
	//---------------------------------------------------------------------------------------------

	/**
	Deep-copies `root` into another engine, returning a temporary in `dst`.

	Every object is plainly allocated, rather than taken from `dst`'s pools. Atoms and dictionary
	keys are re-interned. Sharing and cycles are reproduced.
	*/
	pub fn transfer(&self, root: Val, dst: &mut Engine) -> Val {
		let mut memo = FnvHashMap::<Val, Val>::default();
		let mut containers = Vec::new();
		let mut stack = vec![root];

		while let Some(val) = stack.pop() {
			if memo.contains_key(&val) {
				continue
			}

			let kind = self.kind(val);
			let copy = match *self.heap.data(val) {
				Data::Nil => dst.nil(),
				Data::Bool(b) => dst.boolean(b),
				Data::Atom(sym) => dst.atom(self.sym_name(sym)),
				Data::Number(n) => dst.new_number(n),
				Data::Integer(i) => dst.new_integer(i),
				Data::Float(f) => dst.new_float(f),
				Data::Short(s) => dst.new_short(s),
				Data::Str(ref text) => dst.new_string(text),
				Data::Integers(ref items) => dst.heap.alloc(Data::Integers(items.clone()), Origin::Plain),
				Data::Floats(ref items) => dst.heap.alloc(Data::Floats(items.clone()), Origin::Plain),
				Data::Numbers(ref items) => dst.heap.alloc(Data::Numbers(items.clone()), Origin::Plain),
				Data::Shorts(ref items) => dst.heap.alloc(Data::Shorts(items.clone()), Origin::Plain),
				Data::Strings(ref items) => dst.heap.alloc(Data::Strings(items.clone()), Origin::Plain),
				Data::Values(_) | Data::List(_) | Data::DictStr(_) |
				Data::DictNum(_) | Data::DictInt(_) | Data::Set(_) => {
					containers.push(val);
					self.children_of(val, &mut stack);
					dst.heap.alloc(Data::empty(kind), Origin::Plain)
				}
			};

			memo.insert(val, copy);
		}

		for &val in &containers {
			let copy = memo[&val];
			match self.kind(val) {
				Kind::Values => {
					let copied: Vec<Val> = match Val::slot(self.heap.data(val)) {
						Some(items) => items.iter().map(|item| memo[item]).collect(),
						None => Vec::new()
					};

					for &item in &copied {
						dst.increment(item);
					}

					if let Some(slot) = Val::slot_mut(dst.heap.data_mut(copy)) {
						*slot = copied;
					}
				}
				Kind::List => {
					let chain = match self.heap.data(val) {
						Data::List(first) => self.nodes.chain(*first),
						_ => self.nodes.chain(None)
					};

					let copied: Vec<Val> = chain.nodes.iter().map(|&id| memo[&self.nodes.value(id)]).collect();
					dst.attach_chain(copy, &copied, chain.cycle);
				}
				_ => {
					for (key, item) in self.table_entries(val) {
						let key = match key {
							Key::Atom(sym) => Key::Atom(dst.sym(self.sym_name(sym))),
							key => key
						};

						let item = memo[&item];
						dst.increment(item);
						if let Some(table) = dst.heap.data_mut(copy).table_mut() {
							table.insert(key, item);
						}
					}
				}
			}
		}

		memo[&root]
	}
}
