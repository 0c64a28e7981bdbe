use super::engine::{Engine, Sym};
use super::error::EResult;
use super::gc::Origin;
use super::val::{Data, Kind, Val};
use fnv::FnvHashMap;
use std::cmp::Ordering;

/*

dictionaries and sets share a single representation: a hash table from a canonical Key to an
owned Val. for a dictionary, that Val is the entry's value. for a set, it's the element itself,
kept so that its original kind (and width) can be handed back.

keys are plain data rather than Vals, so they don't take part in the lifecycle protocol. a
dictionary's keys are converted on the way in: string-keyed dictionaries stringify numbers and
atoms, number-keyed dictionaries require numbers, and integer-keyed dictionaries truncate them.
containers are never valid keys.

whole floats are canonicalized to integer keys, so that 2 and 2.0 name the same entry.

iteration order is the natural ordering of the keys. hash order would make printing and
iteration depend on the hasher.

*/

pub(crate) type Table = FnvHashMap<Key, Val>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Key {
	Nil,
	Bool(bool),
	Int(i64),
	Num(u64),
	Str(String),
	Atom(Sym)
}

impl Key {
	fn number(n: f64) -> Key {
		if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
			Key::Int(n as i64)
		} else {
			Key::Num(n.to_bits())
		}
	}

	fn as_f64(&self) -> Option<f64> {
		match *self {
			Key::Int(i) => Some(i as f64),
			Key::Num(bits) => Some(f64::from_bits(bits)),
			_ => None
		}
	}

	//integers and floats interleave by value. the rank only breaks ties between them.
	fn rank(&self) -> u8 {
		match self {
			Key::Nil => 0,
			Key::Bool(_) => 1,
			Key::Int(_) => 2,
			Key::Num(_) => 3,
			Key::Str(_) => 4,
			Key::Atom(_) => 5
		}
	}

	pub(crate) fn text(&self) -> Option<&str> {
		match self {
			Key::Str(s) => Some(s),
			_ => None
		}
	}
}

impl Ord for Key {
	fn cmp(&self, other: &Key) -> Ordering {
		match (self, other) {
			(Key::Bool(a), Key::Bool(b)) => a.cmp(b),
			(Key::Int(a), Key::Int(b)) => a.cmp(b),
			(Key::Str(a), Key::Str(b)) => a.cmp(b),
			(Key::Atom(a), Key::Atom(b)) => a.cmp(b),
			_ => match (self.as_f64(), other.as_f64()) {
				(Some(a), Some(b)) => a.total_cmp(&b).then(self.rank().cmp(&other.rank())),
				_ => self.rank().cmp(&other.rank())
			}
		}
	}
}

impl PartialOrd for Key {
	fn partial_cmp(&self, other: &Key) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

///The key type of a dictionary.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum KeyKind {
	Str,
	Num,
	Int
}

impl KeyKind {
	pub fn kind(self) -> Kind {
		match self {
			KeyKind::Str => Kind::DictStr,
			KeyKind::Num => Kind::DictNum,
			KeyKind::Int => Kind::DictInt
		}
	}
}

/**
A cursor over the entries of a dictionary or set, in key order.

Made by [`Engine::begin_iter`](struct.Engine.html#method.begin_iter). The container counts as
shared for the iterator's lifetime, so any mutation made while iterating is applied to a copy,
and the iterator keeps seeing the original entries. Pass the iterator to
[`Engine::clean_iter`](struct.Engine.html#method.clean_iter) when you're finished with it; a
container which was a temporary when iteration began is a temporary again afterwards.
*/
#[derive(Debug)]
pub struct AssocIter {
	container: Val,
	keys: Vec<Key>,
	position: usize,
	temporary: bool
}

impl Engine {
	//---------------------------------------------------------------------------------------------
	// construction
	//---------------------------------------------------------------------------------------------

	pub fn provide_dict(&mut self, key_kind: KeyKind) -> Val {
		self.heap.provide(key_kind.kind(), |_| ())
	}

	pub fn new_dict(&mut self, key_kind: KeyKind) -> Val {
		let data = Data::empty(key_kind.kind());
		self.heap.alloc(data, Origin::Plain)
	}

	pub fn provide_set(&mut self) -> Val {
		self.heap.provide(Kind::Set, |_| ())
	}

	///Makes a set from the leaves in `items`. Duplicates keep their first occurrence.
	pub fn set_from_values(&mut self, items: &[Val]) -> EResult<Val> {
		self.scoped(|engine, temps| {
			let set = temps.hold(engine.provide_set());
			for &item in items {
				engine.set_insert(set, item)?;
			}
			Ok(set)
		})
	}

	/**
	Makes a dictionary from a flat sequence of alternating keys and values.

	An odd number of elements is a consistency error. When a key repeats, the last value wins.
	*/
	pub fn dict_from_pairs(&mut self, key_kind: KeyKind, pairs: Val) -> EResult<Val> {
		self.scoped(|engine, temps| {
			let items = engine.sequence_values(pairs, temps)?;
			ensure!(
				items.len() % 2 == 0,
				Consistency,
				"a dictionary needs an even number of keys and values, received {}",
				items.len()
			);

			let dict = temps.hold(engine.provide_dict(key_kind));
			for pair in items.chunks(2) {
				engine.record(dict, pair[0], pair[1])?;
			}
			Ok(dict)
		})
	}

	//---------------------------------------------------------------------------------------------
	// keys
	//---------------------------------------------------------------------------------------------

	fn table(&self, container: Val) -> EResult<&Table> {
		let data = self.heap.data(container);
		match data.table() {
			Some(table) => Ok(table),
			None => bail!(
				TypeMismatch,
				"expected a dictionary or a set, received {}",
				data.kind().a_type_name()
			)
		}
	}

	fn table_mut(&mut self, container: Val) -> &mut Table {
		match self.heap.data_mut(container).table_mut() {
			Some(table) => table,
			None => panic!("{:?} is not a dictionary or a set", container)
		}
	}

	pub(crate) fn key_of(&self, container_kind: Kind, key: Val) -> EResult<Key> {
		let data = self.heap.data(key);
		ensure!(
			data.kind().is_leaf(),
			TypeMismatch,
			"{} can't be used as a key",
			data.kind().a_type_name()
		);

		Ok(match container_kind {
			Kind::DictStr => match data {
				Data::Str(s) => Key::Str(s.clone()),
				Data::Atom(sym) => Key::Str(self.sym_name(*sym).to_string()),
				_ if data.kind().is_numeric() => Key::Str(self.as_string(key)),
				_ => bail!(TypeMismatch, "expected a string key, received {}", data.kind().a_type_name())
			},
			Kind::DictNum => Key::number(self.as_number(key)?),
			Kind::DictInt => Key::Int(self.as_integer(key)?),
			_ => match *data {
				Data::Nil => Key::Nil,
				Data::Bool(b) => Key::Bool(b),
				Data::Integer(i) => Key::Int(i),
				Data::Short(s) => Key::Int(s as i64),
				Data::Number(n) => Key::number(n),
				Data::Float(f) => Key::number(f as f64),
				Data::Str(ref s) => Key::Str(s.clone()),
				Data::Atom(sym) => Key::Atom(sym),
				_ => bail!(TypeMismatch, "{} can't be used as a key", data.kind().a_type_name())
			}
		})
	}

	//materializes a dictionary key as a temporary
	fn key_val(&mut self, key: &Key) -> Val {
		match *key {
			Key::Nil => self.nil(),
			Key::Bool(b) => self.boolean(b),
			Key::Int(i) => self.provide_integer(i),
			Key::Num(bits) => self.provide_number(f64::from_bits(bits)),
			Key::Str(ref s) => self.provide_string(s),
			Key::Atom(sym) => self.atom_for(sym)
		}
	}

	pub(crate) fn sorted_keys(&self, container: Val) -> EResult<Vec<Key>> {
		let mut keys: Vec<Key> = self.table(container)?.keys().cloned().collect();
		keys.sort();
		Ok(keys)
	}

	//the entries of a dictionary or set in key order
	pub(crate) fn sorted_entries(&self, container: Val) -> EResult<Vec<(Key, Val)>> {
		let mut entries: Vec<(Key, Val)> = self.table(container)?
			.iter()
			.map(|(key, &val)| (key.clone(), val))
			.collect();
		entries.sort_by(|a, b| a.0.cmp(&b.0));
		Ok(entries)
	}

	//---------------------------------------------------------------------------------------------
	// dictionary operations
	//---------------------------------------------------------------------------------------------

	/**
	Stores `value` under `key`, replacing any previous value.

	Returns the dictionary which was actually mutated, which is a copy when `dict` is shared.
	*/
	pub fn record(&mut self, dict: Val, key: Val, value: Val) -> EResult<Val> {
		let kind = self.kind(dict);
		ensure!(kind.is_dict(), TypeMismatch, "expected a dictionary, received {}", kind.a_type_name());

		let key = self.key_of(kind, key)?;
		let dict = self.duplicate_if_shared(dict);

		self.increment(value);
		if let Some(old) = self.table_mut(dict).insert(key, value) {
			self.decrement(old);
		}

		Ok(dict)
	}

	/**
	Looks up a key. For a dictionary, returns the value stored under it. For a set, returns the
	stored element.

	Leaves which can't be converted to the container's key type are simply absent, but a
	container key is a type mismatch.
	*/
	pub fn lookup(&self, container: Val, key: Val) -> EResult<Option<Val>> {
		let kind = self.kind(container);
		let table = self.table(container)?;

		match self.key_of(kind, key) {
			Ok(key) => Ok(table.get(&key).copied()),
			Err(_) if self.kind(key).is_leaf() => Ok(None),
			Err(err) => Err(err)
		}
	}

	///Removes a key, if it's present. Returns the container which was actually mutated.
	pub fn remove_key(&mut self, container: Val, key: Val) -> EResult<Val> {
		if self.lookup(container, key)?.is_none() {
			return Ok(container)
		}

		let key = self.key_of(self.kind(container), key)?;
		let container = self.duplicate_if_shared(container);
		if let Some(old) = self.table_mut(container).remove(&key) {
			self.decrement(old);
		}

		Ok(container)
	}

	/**
	The keys of a dictionary as a typed vector, in key order: a string vector for string-keyed
	dictionaries, and a number or integer vector for numeric keys. For a set, its elements as a
	generic vector.
	*/
	pub fn thekeys(&mut self, container: Val) -> EResult<Val> {
		let kind = self.kind(container);
		let entries = self.sorted_entries(container)?;

		Ok(match kind {
			Kind::DictStr => {
				let keys: Vec<String> = entries.iter()
					.map(|(key, _)| key.text().unwrap_or_default().to_string())
					.collect();
				self.provide_vec(keys)
			}
			Kind::DictNum => {
				let keys: Vec<f64> = entries.iter().filter_map(|(key, _)| key.as_f64()).collect();
				self.provide_vec(keys)
			}
			Kind::DictInt => {
				let keys: Vec<i64> = entries.iter().filter_map(|(key, _)| {
					key.as_f64().map(|n| n as i64)
				}).collect();
				self.provide_vec(keys)
			}
			_ => {
				let elements: Vec<Val> = entries.into_iter().map(|(_, val)| val).collect();
				self.provide_vec(elements)
			}
		})
	}

	///The values of a dictionary (or the elements of a set) as a generic vector, in key order.
	pub fn thevalues(&mut self, container: Val) -> EResult<Val> {
		let values: Vec<Val> = self.sorted_entries(container)?.into_iter().map(|(_, val)| val).collect();
		Ok(self.provide_vec(values))
	}

	//---------------------------------------------------------------------------------------------
	// set operations
	//---------------------------------------------------------------------------------------------

	///Inserts a leaf into a set. An element equal to one already present is ignored. Returns the
	///set which was actually mutated.
	pub fn set_insert(&mut self, set: Val, item: Val) -> EResult<Val> {
		let kind = self.kind(set);
		ensure!(kind == Kind::Set, TypeMismatch, "expected a set, received {}", kind.a_type_name());

		let key = self.key_of(kind, item)?;
		if self.table(set)?.contains_key(&key) {
			return Ok(set)
		}

		let set = self.duplicate_if_shared(set);
		self.increment(item);
		self.table_mut(set).insert(key, item);

		Ok(set)
	}

	pub fn set_contains(&self, set: Val, item: Val) -> EResult<bool> {
		let kind = self.kind(set);
		ensure!(kind == Kind::Set, TypeMismatch, "expected a set, received {}", kind.a_type_name());
		Ok(self.lookup(set, item)?.is_some())
	}

	pub fn set_remove(&mut self, set: Val, item: Val) -> EResult<Val> {
		let kind = self.kind(set);
		ensure!(kind == Kind::Set, TypeMismatch, "expected a set, received {}", kind.a_type_name());
		self.remove_key(set, item)
	}

	//the elements of a set, in order
	pub(crate) fn set_values(&self, set: Val) -> EResult<Vec<Val>> {
		Ok(self.sorted_entries(set)?.into_iter().map(|(_, val)| val).collect())
	}

	//---------------------------------------------------------------------------------------------
	// iteration
	//---------------------------------------------------------------------------------------------

	pub fn begin_iter(&mut self, container: Val) -> EResult<AssocIter> {
		let keys = self.sorted_keys(container)?;

		//a count of 1 would still be unique, so a temporary is held twice
		let temporary = self.status(container).count() == Some(0);
		self.increment_by(container, if temporary { 2 } else { 1 });

		Ok(AssocIter {
			container,
			keys,
			position: 0,
			temporary
		})
	}

	/**
	Advances an iterator, returning the next key and its value.

	For a dictionary, the key is a new temporary and the value is owned by the dictionary. For a
	set, both halves of the pair are the stored element.
	*/
	pub fn next_iter(&mut self, iter: &mut AssocIter) -> Option<(Val, Val)> {
		while iter.position < iter.keys.len() {
			let index = iter.position;
			iter.position += 1;

			let key = &iter.keys[index];

			let value = self.heap.data(iter.container).table().and_then(|table| table.get(key).copied());
			if let Some(value) = value {
				if self.kind(iter.container) == Kind::Set {
					return Some((value, value))
				} else {
					let key = self.key_val(key);
					return Some((key, value))
				}
			}
		}

		None
	}

	pub fn clean_iter(&mut self, iter: AssocIter) {
		if iter.temporary {
			self.disown(iter.container);
			self.disown(iter.container);
		} else {
			self.decrement(iter.container);
		}
	}
}

//printing visits keys without materializing them
impl Key {
	pub(crate) fn display_in(&self, engine: &Engine) -> String {
		match *self {
			Key::Nil => "nil".to_string(),
			Key::Bool(b) => if b { "true".to_string() } else { "false".to_string() },
			Key::Int(i) => i.to_string(),
			Key::Num(bits) => super::print::format_number(f64::from_bits(bits)),
			Key::Str(ref s) => s.clone(),
			Key::Atom(sym) => engine.sym_name(sym).to_string()
		}
	}
}
