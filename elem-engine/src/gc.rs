use super::engine::{Engine, EngineBuilder};
use super::error::EResult;
use super::val::{Data, Kind, Val, KIND_COUNT};
use fnv::{FnvHashMap, FnvHashSet};
use smallvec::SmallVec;
use std::fmt::{self, Debug, Formatter};
use std::mem;
use tracing::{debug, trace};

/*

values are reference-counted through an intrusive 16-bit status word, rather than traced. the
evaluator increments a value when it stores it somewhere, and decrements it when it overwrites
or drops that reference. a freshly made value has status 0; it's a temporary, and it's the
caller's responsibility to either store it (increment) or release it.

two sentinel statuses take a value out of the protocol entirely. "protected" values belong to an
external collector, which decides when they die (see collect_protected). "constant" values are
permanent.

objects live in a flat table of entries. a Val is just an index into that table, tagged with the
id of its engine. each entry records where it came from:
	- Plain entries are destroyed on reclaim. their slot goes to the general vacant list.
	- Pool entries are cleared on reclaim and pushed onto their kind's free list (the Recycler),
	  so that the next provide_* call for that kind can reuse both the slot and its buffers.
	- Const entries are never reclaimed.

reclaiming an object releases each of its owned children exactly once. we use an explicit work
stack rather than recursion, so that a long chain of nested containers can't overflow the
native stack.

*/

//-------------------------------------------------------------------------------------------------
// Status
//-------------------------------------------------------------------------------------------------

/**
The status word of a value: either a share count, or one of two sentinels.
*/

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Status(pub(crate) u16);

impl Status {
	///A temporary, owned by nobody.
	pub const DESTRUCTIBLE: Status = Status(0);

	///Inert to the lifecycle protocol until it's unprotected.
	pub const PROTECTED: Status = Status(0xfffe);

	///Permanently inert.
	pub const CONSTANT: Status = Status(0xffff);

	///The largest share count a value can reach.
	pub const MAX_COUNT: u16 = 0xfffd;

	///Returns the share count, or `None` for protected and constant values.
	#[inline]
	pub fn count(self) -> Option<u16> {
		if self.0 <= Status::MAX_COUNT {
			Some(self.0)
		} else {
			None
		}
	}

	#[inline]
	pub fn is_protected(self) -> bool {
		self == Status::PROTECTED
	}

	#[inline]
	pub fn is_constant(self) -> bool {
		self == Status::CONSTANT
	}

	///Returns `true` for protected and constant values.
	#[inline]
	pub fn is_inert(self) -> bool {
		self.0 > Status::MAX_COUNT
	}

	pub fn raw(self) -> u16 {
		self.0
	}
}

impl Debug for Status {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match *self {
			Status::PROTECTED => write!(f, "Status(protected)"),
			Status::CONSTANT => write!(f, "Status(constant)"),
			Status(count) => write!(f, "Status({})", count)
		}
	}
}

//-------------------------------------------------------------------------------------------------
// Heap
//-------------------------------------------------------------------------------------------------

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum Origin {
	Plain,
	Pool,
	Const
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum SlotState {
	Vacant,
	Live,
	Pooled
}

pub(crate) struct Entry {
	pub(crate) status: Status,
	origin: Origin,
	state: SlotState,
	pub(crate) data: Data
}

struct Recycler {
	pools: [Vec<u32>; KIND_COUNT],
	limit: usize,
	enabled: bool
}

pub(crate) struct Heap {
	engine_id: u32,
	entries: Vec<Entry>,
	vacant: Vec<u32>,
	recycler: Recycler,
	fresh: [usize; KIND_COUNT]
}

impl Heap {
	pub(crate) fn new(engine_id: u32, builder: &EngineBuilder) -> Heap {
		Heap {
			engine_id,
			entries: Vec::with_capacity(builder.object_capacity),
			vacant: Vec::new(),
			recycler: Recycler {
				pools: Default::default(),
				limit: builder.pool_limit,
				enabled: builder.pooling
			},
			fresh: [0; KIND_COUNT]
		}
	}

	#[inline]
	fn check(&self, val: Val) {
		if val.engine != self.engine_id {
			panic!(
				"a Val from engine {} was passed to engine {}",
				val.engine,
				self.engine_id
			)
		}
	}

	#[inline]
	pub(crate) fn entry(&self, val: Val) -> &Entry {
		self.check(val);
		let entry = &self.entries[val.index as usize];
		assert!(entry.state == SlotState::Live, "attempted to access a reclaimed value");
		entry
	}

	#[inline]
	pub(crate) fn entry_mut(&mut self, val: Val) -> &mut Entry {
		self.check(val);
		let entry = &mut self.entries[val.index as usize];
		assert!(entry.state == SlotState::Live, "attempted to access a reclaimed value");
		entry
	}

	#[inline]
	pub(crate) fn data(&self, val: Val) -> &Data {
		&self.entry(val).data
	}

	#[inline]
	pub(crate) fn data_mut(&mut self, val: Val) -> &mut Data {
		&mut self.entry_mut(val).data
	}

	pub(crate) fn is_live(&self, val: Val) -> bool {
		self.check(val);
		self.entries[val.index as usize].state == SlotState::Live
	}

	pub(crate) fn alloc(&mut self, data: Data, origin: Origin) -> Val {
		self.fresh[data.kind() as usize] += 1;

		let entry = Entry {
			status: if origin == Origin::Const { Status::CONSTANT } else { Status::DESTRUCTIBLE },
			origin,
			state: SlotState::Live,
			data
		};

		let index = match self.vacant.pop() {
			Some(index) => {
				self.entries[index as usize] = entry;
				index
			}
			None => {
				assert!(self.entries.len() < u32::MAX as usize, "object table exhausted");
				self.entries.push(entry);
				(self.entries.len() - 1) as u32
			}
		};

		Val { index, engine: self.engine_id }
	}

	///Pops a cleared instance from the kind's pool if one is available, or allocates a fresh
	///one otherwise. `fill` receives an empty payload of the requested kind.
	pub(crate) fn provide<F: FnOnce(&mut Data)>(&mut self, kind: Kind, fill: F) -> Val {
		if !self.recycler.enabled {
			let mut data = Data::empty(kind);
			fill(&mut data);
			return self.alloc(data, Origin::Plain)
		}

		match self.recycler.pools[kind as usize].pop() {
			Some(index) => {
				trace!(kind = kind.type_name(), "pool hit");

				let entry = &mut self.entries[index as usize];
				debug_assert!(entry.state == SlotState::Pooled);
				entry.state = SlotState::Live;
				entry.status = Status::DESTRUCTIBLE;
				fill(&mut entry.data);

				Val { index, engine: self.engine_id }
			}
			None => {
				trace!(kind = kind.type_name(), "pool miss");

				let mut data = Data::empty(kind);
				fill(&mut data);
				self.alloc(data, Origin::Pool)
			}
		}
	}

	pub(crate) fn take_data(&mut self, val: Val) -> Data {
		mem::replace(&mut self.entry_mut(val).data, Data::Nil)
	}

	//the final step of reclaiming an object, once its children have been detached from `data`
	fn recycle(&mut self, val: Val, mut data: Data) {
		let kind = data.kind();
		let entry = &mut self.entries[val.index as usize];
		entry.status = Status::DESTRUCTIBLE;

		let pool = &mut self.recycler.pools[kind as usize];
		if entry.origin == Origin::Pool && self.recycler.enabled && pool.len() < self.recycler.limit {
			data.clear();
			entry.data = data;
			entry.state = SlotState::Pooled;
			pool.push(val.index);
		} else {
			entry.data = Data::Nil;
			entry.state = SlotState::Vacant;
			self.vacant.push(val.index);
		}
	}

	pub(crate) fn census(&self) -> impl Iterator<Item = (Kind, SlotState)> + '_ {
		self.entries.iter().map(|entry| (entry.data.kind(), entry.state))
	}

	pub(crate) fn fresh_counts(&self) -> &[usize; KIND_COUNT] {
		&self.fresh
	}

	fn live_vals(&self) -> impl Iterator<Item = Val> + '_ {
		let engine = self.engine_id;
		self.entries.iter().enumerate().filter_map(move |(i, entry)| {
			if entry.state == SlotState::Live {
				Some(Val { index: i as u32, engine })
			} else {
				None
			}
		})
	}
}

//-------------------------------------------------------------------------------------------------
// the lifecycle protocol
//-------------------------------------------------------------------------------------------------

type Pending = SmallVec<[Val; 8]>;

impl Engine {
	pub fn status(&self, val: Val) -> Status {
		self.status_of(val)
	}

	///Returns `true` if `val` hasn't been reclaimed. Panics if `val` belongs to another engine.
	pub fn is_live(&self, val: Val) -> bool {
		self.heap.is_live(val)
	}

	///Returns `false` for a value which is owned by at most one reference, so that it can be
	///mutated in place. Protected and constant values always count as shared.
	pub fn is_shared(&self, val: Val) -> bool {
		!matches!(self.status_of(val).count(), Some(0) | Some(1))
	}

	///Registers one more owner of `val`. Panics if the share count would overflow.
	pub fn increment(&mut self, val: Val) {
		self.increment_by(val, 1)
	}

	pub fn increment_by(&mut self, val: Val, n: u16) {
		let entry = self.heap.entry_mut(val);
		if let Some(count) = entry.status.count() {
			assert!(
				Status::MAX_COUNT - count >= n,
				"status overflow: a value may have at most {} owners",
				Status::MAX_COUNT
			);
			entry.status = Status(count + n);
		}
	}

	///Drops one owner of `val`, reclaiming it when no owners remain. Decrementing a temporary
	///(status 0) reclaims it.
	pub fn decrement(&mut self, val: Val) {
		let mut pending = Pending::new();
		self.unref(val, &mut pending);
		self.reclaim(pending);
	}

	pub fn decrement_by(&mut self, val: Val, n: u16) {
		let entry = self.heap.entry_mut(val);
		if let Some(count) = entry.status.count() {
			if count <= n {
				entry.status = Status::DESTRUCTIBLE;
				self.reclaim(smallvec::smallvec![val]);
			} else {
				entry.status = Status(count - n);
			}
		}
	}

	///Reclaims `val` if it's a temporary (status 0). Otherwise, does nothing.
	pub fn release(&mut self, val: Val) {
		if self.status_of(val).count() == Some(0) {
			self.reclaim(smallvec::smallvec![val]);
		}
	}

	//drops one owner without reclaiming, handing the caller a temporary
	pub(crate) fn disown(&mut self, val: Val) {
		let entry = self.heap.entry_mut(val);
		if let Some(count) = entry.status.count() {
			entry.status = Status(count.saturating_sub(1));
		}
	}

	fn unref(&mut self, val: Val, pending: &mut Pending) {
		let entry = self.heap.entry_mut(val);
		match entry.status.count() {
			None => (),
			Some(0) | Some(1) => {
				entry.status = Status::DESTRUCTIBLE;
				pending.push(val);
			}
			Some(count) => entry.status = Status(count - 1)
		}
	}

	fn reclaim(&mut self, mut pending: Pending) {
		let mut children = Vec::new();

		while let Some(val) = pending.pop() {
			let mut data = self.heap.take_data(val);
			match &mut data {
				Data::Values(vals) => children.extend(vals.drain(..)),
				Data::DictStr(table) | Data::DictNum(table) |
				Data::DictInt(table) | Data::Set(table) => {
					children.extend(table.drain().map(|(_, item)| item))
				}
				Data::List(first) => {
					if let Some(node) = first.take() {
						self.nodes.drop_ref(node, &mut children);
					}
				}
				_ => ()
			}

			self.heap.recycle(val, data);

			for child in children.drain(..) {
				self.unref(child, &mut pending);
			}
		}
	}

	//pushes each value directly owned by `val` onto `out`
	pub(crate) fn children_of(&self, val: Val, out: &mut Vec<Val>) {
		match self.heap.data(val) {
			Data::Values(vals) => out.extend_from_slice(vals),
			Data::DictStr(table) | Data::DictNum(table) |
			Data::DictInt(table) | Data::Set(table) => out.extend(table.values().copied()),
			Data::List(first) => {
				let chain = self.nodes.chain(*first);
				out.extend(chain.nodes.iter().map(|&node| self.nodes.value(node)));
			}
			_ => ()
		}
	}

	//---------------------------------------------------------------------------------------------
	// protection
	//---------------------------------------------------------------------------------------------

	///Takes `val`, and everything it currently contains, out of the lifecycle protocol until
	///[`unprotect`](#method.unprotect) is called.
	pub fn protect(&mut self, val: Val) {
		self.set_inert(val, Status::PROTECTED)
	}

	///Makes `val`, and everything it currently contains, permanent.
	pub fn make_constant(&mut self, val: Val) {
		self.set_inert(val, Status::CONSTANT)
	}

	fn set_inert(&mut self, root: Val, status: Status) {
		let mut seen = FnvHashSet::default();
		let mut stack = vec![root];
		let mut children = Vec::new();

		while let Some(val) = stack.pop() {
			if !seen.insert(val) {
				continue
			}

			let entry = self.heap.entry_mut(val);
			if entry.status.is_constant() {
				continue
			}
			entry.status = status;

			self.children_of(val, &mut children);
			stack.append(&mut children);
		}
	}

	/**
	Returns a protected value to the lifecycle protocol.

	`val` itself becomes a temporary (status 0). Protected values reachable from it revert to a
	share count of 1, owned by their container.
	*/
	pub fn unprotect(&mut self, root: Val) {
		let mut seen = FnvHashSet::default();
		let mut stack = vec![root];
		let mut children = Vec::new();

		while let Some(val) = stack.pop() {
			if !seen.insert(val) {
				continue
			}

			let entry = self.heap.entry_mut(val);
			if !entry.status.is_protected() {
				continue
			}
			entry.status = if val == root { Status::DESTRUCTIBLE } else { Status(1) };

			self.children_of(val, &mut children);
			stack.append(&mut children);
		}
	}

	//---------------------------------------------------------------------------------------------
	// collector cooperation
	//---------------------------------------------------------------------------------------------

	///Inserts `val`, and every value transitively reachable from it, into `out`.
	pub fn garbaging_values(&self, val: Val, out: &mut FnvHashSet<Val>) {
		let mut stack = vec![val];
		while let Some(val) = stack.pop() {
			if out.insert(val) {
				self.children_of(val, &mut stack);
			}
		}
	}

	/**
	Unprotects and reclaims every protected value which isn't reachable from `roots`.

	Returns the number of values which were unprotected.
	*/
	pub fn collect_protected(&mut self, roots: &[Val]) -> usize {
		let mut reachable = FnvHashSet::default();
		for &root in roots {
			self.garbaging_values(root, &mut reachable);
		}

		let doomed: Vec<Val> = self.heap.live_vals().filter(|&val| {
			self.status_of(val).is_protected() && !reachable.contains(&val)
		}).collect();

		if doomed.is_empty() {
			return 0
		}

		debug!(
			engine = self.id(),
			reachable = reachable.len(),
			doomed = doomed.len(),
			"sweeping protected values"
		);

		//each doomed value's new share count is the number of references held by other doomed
		//values, so that reclaiming the unowned ones cascades through the rest
		let doomed_set: FnvHashSet<Val> = doomed.iter().copied().collect();
		let mut owners = FnvHashMap::<Val, u16>::default();
		let mut children = Vec::new();
		for &val in &doomed {
			self.children_of(val, &mut children);
			for child in children.drain(..) {
				if doomed_set.contains(&child) {
					let count = owners.entry(child).or_insert(0);
					*count = count.saturating_add(1).min(Status::MAX_COUNT);
				}
			}
		}

		let mut unowned = Pending::new();
		for &val in &doomed {
			let count = owners.get(&val).copied().unwrap_or(0);
			self.heap.entry_mut(val).status = Status(count);
			if count == 0 {
				unowned.push(val);
			}
		}

		self.reclaim(unowned);
		doomed.len()
	}
}

//-------------------------------------------------------------------------------------------------
// scoped temporaries
//-------------------------------------------------------------------------------------------------

/**
The temporaries registered during a call to [`Engine::scoped`](struct.Engine.html#method.scoped).

Registered values must not be released by the scope itself; the scope releases them when it ends.
*/

#[derive(Default)]
pub struct Temps {
	held: SmallVec<[Val; 4]>,
	scratch: SmallVec<[Val; 8]>
}

impl Temps {
	///Registers a partially built result. It's released if the scope returns `Err`.
	pub fn hold(&mut self, val: Val) -> Val {
		self.held.push(val);
		val
	}

	///Registers an intermediate value. It's released when the scope ends, whether or not it
	///succeeded; values which were stored somewhere in the meantime survive.
	pub fn scratch(&mut self, val: Val) -> Val {
		self.scratch.push(val);
		val
	}
}

impl Engine {
	/**
	Runs `f`, then releases the temporaries it registered.

	This is how partially built results are cleaned up along error paths:

		let vec = engine.scoped(|engine, temps| {
			let vec = temps.hold(engine.provide_values(&[]));
			for &item in items {
				engine.append(vec, item)?;
			}
			Ok(vec)
		})?;
	*/
	pub fn scoped<R, F>(&mut self, f: F) -> EResult<R>
	where
		F: FnOnce(&mut Engine, &mut Temps) -> EResult<R>
	{
		let mut temps = Temps::default();
		let result = f(self, &mut temps);

		if result.is_err() {
			for &val in temps.held.iter().rev() {
				if self.heap.is_live(val) {
					self.release(val);
				}
			}
		}

		for &val in temps.scratch.iter().rev() {
			if self.heap.is_live(val) {
				self.release(val);
			}
		}

		result
	}
}
