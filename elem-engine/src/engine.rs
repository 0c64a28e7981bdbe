use super::gc::{Heap, Origin, SlotState, Status};
use super::list::NodeArena;
use super::val::{Data, Kind, Val, KIND_COUNT};
use fnv::FnvHashMap;
use std::fmt::{self, Debug, Formatter};
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

/*

an Engine is one execution context's value store. it owns the object table (including the
per-kind pools), the list node arena, the atom table and the permanent constants.

the Engine is not installed into thread-local storage: it's passed
around explicitly as `&mut Engine`. it is Send (so that it can be moved to a worker thread) but
not Sync, because read-only list traversals write generation marks through Cells.

*/

//-------------------------------------------------------------------------------------------------
// engine ids
//-------------------------------------------------------------------------------------------------

static NEXT_ENGINE_ID: AtomicU32 = AtomicU32::new(1);

fn alloc_engine_id() -> u32 {
	let id = NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed);
	assert!(id != u32::MAX, "engine ids exhausted");
	id
}

//-------------------------------------------------------------------------------------------------
// EngineBuilder
//-------------------------------------------------------------------------------------------------

/**
A configurable constructor for an [`Engine`](struct.Engine.html).

	let engine = EngineBuilder::new()
		.pool_limit(64)
		.small_int_cache(-1 ..= 16)
		.build();
*/

#[derive(Clone, Debug)]
pub struct EngineBuilder {
	pub(crate) pool_limit: usize,
	pub(crate) pooling: bool,
	pub(crate) object_capacity: usize,
	pub(crate) node_capacity: usize,
	pub(crate) small_ints: RangeInclusive<i64>
}

impl Default for EngineBuilder {
	fn default() -> EngineBuilder {
		EngineBuilder {
			pool_limit: 1024,
			pooling: true,
			object_capacity: 256,
			node_capacity: 256,
			small_ints: -16 ..= 255
		}
	}
}

impl EngineBuilder {
	pub fn new() -> EngineBuilder {
		EngineBuilder::default()
	}

	///The maximum number of reclaimed instances each kind's pool retains. Reclaimed instances
	///beyond this limit are destroyed instead.
	pub fn pool_limit(mut self, limit: usize) -> EngineBuilder {
		self.pool_limit = limit;
		self
	}

	///When `false`, the `provide_*` constructors behave exactly like `new_*`.
	pub fn pooling(mut self, enabled: bool) -> EngineBuilder {
		self.pooling = enabled;
		self
	}

	pub fn object_capacity(mut self, capacity: usize) -> EngineBuilder {
		self.object_capacity = capacity;
		self
	}

	pub fn node_capacity(mut self, capacity: usize) -> EngineBuilder {
		self.node_capacity = capacity;
		self
	}

	///The range of integers which [`Engine::int_literal`](struct.Engine.html#method.int_literal)
	///returns as permanent constants. An empty range disables the cache.
	pub fn small_int_cache(mut self, range: RangeInclusive<i64>) -> EngineBuilder {
		self.small_ints = range;
		self
	}

	pub fn build(self) -> Engine {
		Engine::with_builder(self)
	}
}

//-------------------------------------------------------------------------------------------------
// Sym
//-------------------------------------------------------------------------------------------------

/**
An interned name.

Syms are only meaningful within the [`Engine`](struct.Engine.html) which created them. Each
sym has exactly one atom value, which is a permanent constant.
*/

#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, Default, PartialOrd, Ord)]
pub struct Sym(pub(crate) u32);

struct SymEntry {
	name: Box<str>,
	atom: Val
}

#[derive(Default)]
pub(crate) struct SymTable {
	entries: Vec<SymEntry>,
	map: FnvHashMap<Box<str>, Sym>
}

//-------------------------------------------------------------------------------------------------
// Consts
//-------------------------------------------------------------------------------------------------

pub(crate) struct Consts {
	pub(crate) nil: Val,
	pub(crate) t: Val,
	pub(crate) f: Val,
	pub(crate) empty_str: Val,
	pub(crate) small_ints: Vec<Val>,
	pub(crate) small_base: i64
}

impl Consts {
	fn new(heap: &mut Heap, small_range: &RangeInclusive<i64>) -> Consts {
		let nil = heap.alloc(Data::Nil, Origin::Const);
		let t = heap.alloc(Data::Bool(true), Origin::Const);
		let f = heap.alloc(Data::Bool(false), Origin::Const);
		let empty_str = heap.alloc(Data::Str(String::new()), Origin::Const);

		let small_ints: Vec<Val> = small_range.clone().map(|n| {
			heap.alloc(Data::Integer(n), Origin::Const)
		}).collect();

		Consts {
			nil,
			t,
			f,
			empty_str,
			small_ints,
			small_base: *small_range.start()
		}
	}
}

//-------------------------------------------------------------------------------------------------
// Engine
//-------------------------------------------------------------------------------------------------

/**
The value store of one execution context.

Every value is addressed by a [`Val`](struct.Val.html) handle which is only meaningful within
the `Engine` that created it. Passing a `Val` to a different `Engine` panics.
*/

pub struct Engine {
	id: u32,
	pub(crate) heap: Heap,
	pub(crate) nodes: NodeArena,
	pub(crate) syms: SymTable,
	pub(crate) consts: Consts
}

impl Default for Engine {
	fn default() -> Engine {
		Engine::new()
	}
}

impl Debug for Engine {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "Engine#{}", self.id)
	}
}

impl Engine {
	pub fn new() -> Engine {
		EngineBuilder::new().build()
	}

	fn with_builder(builder: EngineBuilder) -> Engine {
		let id = alloc_engine_id();

		let mut heap = Heap::new(id, &builder);
		let consts = Consts::new(&mut heap, &builder.small_ints);

		debug!(
			engine = id,
			pool_limit = builder.pool_limit,
			pooling = builder.pooling,
			small_ints = consts.small_ints.len(),
			"created engine"
		);

		Engine {
			id,
			heap,
			nodes: NodeArena::with_capacity(builder.node_capacity),
			syms: SymTable::default(),
			consts
		}
	}

	///Returns this engine's unique id. Every [`Val`](struct.Val.html) records the id of the
	///engine which created it.
	pub fn id(&self) -> u32 {
		self.id
	}

	//---------------------------------------------------------------------------------------------
	// constants
	//---------------------------------------------------------------------------------------------

	pub fn nil(&self) -> Val {
		self.consts.nil
	}

	pub fn boolean(&self, b: bool) -> Val {
		if b {
			self.consts.t
		} else {
			self.consts.f
		}
	}

	pub fn empty_string(&self) -> Val {
		self.consts.empty_str
	}

	//---------------------------------------------------------------------------------------------
	// syms and atoms
	//---------------------------------------------------------------------------------------------

	///Interns a name, returning its [`Sym`](struct.Sym.html).
	pub fn sym(&mut self, name: &str) -> Sym {
		if let Some(&sym) = self.syms.map.get(name) {
			return sym
		}

		let sym = Sym(self.syms.entries.len() as u32);
		let atom = self.heap.alloc(Data::Atom(sym), Origin::Const);

		self.syms.entries.push(SymEntry {
			name: name.into(),
			atom
		});
		self.syms.map.insert(name.into(), sym);

		sym
	}

	pub fn sym_name(&self, sym: Sym) -> &str {
		&self.syms.entries[sym.0 as usize].name
	}

	///Returns the atom value for a name, interning it if necessary. Atoms are permanent
	///constants.
	pub fn atom(&mut self, name: &str) -> Val {
		let sym = self.sym(name);
		self.atom_for(sym)
	}

	pub fn atom_for(&self, sym: Sym) -> Val {
		self.syms.entries[sym.0 as usize].atom
	}

	//---------------------------------------------------------------------------------------------
	// stats
	//---------------------------------------------------------------------------------------------

	///Takes a census of the object table and the node arena.
	pub fn stats(&self) -> EngineStats {
		let mut stats = EngineStats::default();

		for (kind, state) in self.heap.census() {
			match state {
				SlotState::Live => {
					stats.live += 1;
					stats.kinds[kind as usize].live += 1;
				}
				SlotState::Pooled => {
					stats.pooled += 1;
					stats.kinds[kind as usize].pooled += 1;
				}
				SlotState::Vacant => stats.vacant += 1
			}
		}

		for (kind_stats, &fresh) in stats.kinds.iter_mut().zip(self.heap.fresh_counts()) {
			kind_stats.fresh = fresh;
		}

		let (live_nodes, vacant_nodes) = self.nodes.census();
		stats.live_nodes = live_nodes;
		stats.vacant_nodes = vacant_nodes;

		stats
	}

	#[inline]
	pub(crate) fn status_of(&self, val: Val) -> Status {
		self.heap.entry(val).status
	}
}

//-------------------------------------------------------------------------------------------------
// EngineStats
//-------------------------------------------------------------------------------------------------

///Per-kind counts reported by [`Engine::stats`](struct.Engine.html#method.stats).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct KindStats {
	///Objects of this kind which are currently reachable through a `Val`.
	pub live: usize,

	///Reclaimed objects of this kind which are waiting in the pool.
	pub pooled: usize,

	///The number of times a `provide_*` constructor found the pool empty, or a `new_*`
	///constructor ran, for this kind.
	pub fresh: usize
}

///A census of an [`Engine`](struct.Engine.html).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
	pub live: usize,
	pub pooled: usize,
	pub vacant: usize,
	pub live_nodes: usize,
	pub vacant_nodes: usize,
	kinds: [KindStats; KIND_COUNT]
}

impl EngineStats {
	pub fn kind(&self, kind: Kind) -> KindStats {
		self.kinds[kind as usize]
	}
}

//-------------------------------------------------------------------------------------------------
// Parcel
//-------------------------------------------------------------------------------------------------

/**
A value which has been packed up to be moved to another thread.

A `Parcel` owns a private [`Engine`](struct.Engine.html) holding a deep copy of the packed value.
It's produced by [`Engine::pack`](struct.Engine.html#method.pack) and consumed by
[`Engine::unpack`](struct.Engine.html#method.unpack).
*/

pub struct Parcel {
	engine: Engine,
	root: Val
}

impl Debug for Parcel {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "Parcel({})", self.engine.as_string(self.root))
	}
}

impl Engine {
	///Deep-copies a value into a new [`Parcel`](struct.Parcel.html), which can be sent to
	///another thread. The source value is unaffected.
	pub fn pack(&self, val: Val) -> Parcel {
		let mut engine = EngineBuilder::new()
			.pooling(false)
			.object_capacity(16)
			.node_capacity(16)
			.small_int_cache(0 ..= -1)
			.build();

		let root = self.transfer(val, &mut engine);
		engine.increment(root);

		Parcel { engine, root }
	}

	///Copies the contents of a [`Parcel`](struct.Parcel.html) into this engine. The result is a
	///temporary (status 0).
	pub fn unpack(&mut self, parcel: Parcel) -> Val {
		parcel.engine.transfer(parcel.root, self)
	}
}
