use super::engine::Engine;
use super::error::EResult;
use super::gc::Temps;
use super::seq::{self, resolve_index, resolve_insertion, resolve_slice, Anchor, Haystack, SetOp, SliceBound};
use super::val::{Data, Kind, Val};
use std::convert::TryFrom;
use std::mem;

/*

the vector family: Integers, Floats, Numbers, Shorts, Strings and Values. each is a Vec of plain
Rust values, apart from Values, which holds owned Val handles.

every operation is written once, generically over the Element trait, and then dispatched on the
vector's Kind by the with_element! macro. Element captures the handful of ways the kinds
differ: how an element is converted to and from a Val, how two elements are compared, and
whether storing an element means taking ownership of a Val.

cons lists share most of these operations; they convert to a Vec<Val>, run the same algorithm
from seq.rs, and then write back or build a new list.

mutating operations follow copy-on-write: if the target is shared, it's copied first, and the
operation returns whichever handle was actually mutated.

*/

//-------------------------------------------------------------------------------------------------
// Element
//-------------------------------------------------------------------------------------------------

pub(crate) trait Element: Clone {
	const KIND: Kind;

	fn slot(data: &Data) -> Option<&Vec<Self>>;
	fn slot_mut(data: &mut Data) -> Option<&mut Vec<Self>>;

	fn from_val(engine: &Engine, val: Val) -> EResult<Self>;
	fn to_val(&self, engine: &mut Engine) -> Val;

	//is this element equal to an arbitrary value?
	fn matches(&self, engine: &Engine, val: Val) -> bool;

	fn same(engine: &Engine, a: &Self, b: &Self) -> bool;
	fn natural_less(engine: &Engine, a: &Self, b: &Self) -> EResult<bool>;

	//called when an element is stored in, or removed from, a vector
	fn adopt(&self, _engine: &mut Engine) { }
	fn abandon(&self, _engine: &mut Engine) { }
}

macro_rules! numeric_element {
	($t:ty, $vec_kind:ident, $provide:ident, |$engine:ident, $val:ident| $convert:expr) => (
		impl Element for $t {
			const KIND: Kind = Kind::$vec_kind;

			fn slot(data: &Data) -> Option<&Vec<$t>> {
				match data {
					Data::$vec_kind(items) => Some(items),
					_ => None
				}
			}

			fn slot_mut(data: &mut Data) -> Option<&mut Vec<$t>> {
				match data {
					Data::$vec_kind(items) => Some(items),
					_ => None
				}
			}

			fn from_val($engine: &Engine, $val: Val) -> EResult<$t> {
				$convert
			}

			fn to_val(&self, engine: &mut Engine) -> Val {
				engine.$provide(*self)
			}

			fn matches(&self, engine: &Engine, val: Val) -> bool {
				engine.as_number(val).map_or(false, |n| n == *self as f64)
			}

			fn same(_engine: &Engine, a: &$t, b: &$t) -> bool {
				a == b
			}

			fn natural_less(_engine: &Engine, a: &$t, b: &$t) -> EResult<bool> {
				Ok(a < b)
			}
		}
	);
}

numeric_element!(i64, Integers, provide_integer, |engine, val| engine.as_integer(val));
numeric_element!(f64, Numbers, provide_number, |engine, val| engine.as_number(val));
numeric_element!(f32, Floats, provide_float, |engine, val| engine.as_number(val).map(|n| n as f32));
numeric_element!(i16, Shorts, provide_short, |engine, val| {
	let n = engine.as_integer(val)?;
	i16::try_from(n).map_err(|_| error!(TypeMismatch, "{} does not fit in a short", n))
});

impl Element for String {
	const KIND: Kind = Kind::Strings;

	fn slot(data: &Data) -> Option<&Vec<String>> {
		match data {
			Data::Strings(items) => Some(items),
			_ => None
		}
	}

	fn slot_mut(data: &mut Data) -> Option<&mut Vec<String>> {
		match data {
			Data::Strings(items) => Some(items),
			_ => None
		}
	}

	//numbers are stringified, but containers are rejected
	fn from_val(engine: &Engine, val: Val) -> EResult<String> {
		let kind = engine.kind(val);
		match kind {
			Kind::Str | Kind::Atom => Ok(engine.as_str(val)?.to_string()),
			_ if kind.is_leaf() => Ok(engine.as_string(val)),
			_ => bail!(TypeMismatch, "expected a string, received {}", kind.a_type_name())
		}
	}

	fn to_val(&self, engine: &mut Engine) -> Val {
		engine.provide_string(self)
	}

	fn matches(&self, engine: &Engine, val: Val) -> bool {
		matches!(engine.heap.data(val), Data::Str(text) if text == self)
	}

	fn same(_engine: &Engine, a: &String, b: &String) -> bool {
		a == b
	}

	fn natural_less(_engine: &Engine, a: &String, b: &String) -> EResult<bool> {
		Ok(a < b)
	}
}

impl Element for Val {
	const KIND: Kind = Kind::Values;

	fn slot(data: &Data) -> Option<&Vec<Val>> {
		match data {
			Data::Values(items) => Some(items),
			_ => None
		}
	}

	fn slot_mut(data: &mut Data) -> Option<&mut Vec<Val>> {
		match data {
			Data::Values(items) => Some(items),
			_ => None
		}
	}

	fn from_val(_engine: &Engine, val: Val) -> EResult<Val> {
		Ok(val)
	}

	fn to_val(&self, _engine: &mut Engine) -> Val {
		*self
	}

	fn matches(&self, engine: &Engine, val: Val) -> bool {
		engine.equal(*self, val)
	}

	fn same(engine: &Engine, a: &Val, b: &Val) -> bool {
		engine.equal(*a, *b)
	}

	fn natural_less(engine: &Engine, a: &Val, b: &Val) -> EResult<bool> {
		engine.less(*a, *b)
	}

	fn adopt(&self, engine: &mut Engine) {
		engine.increment(*self)
	}

	fn abandon(&self, engine: &mut Engine) {
		engine.decrement(*self)
	}
}

//binds $T to the element type of a vector kind, or evaluates the fallback for any other kind
macro_rules! with_element {
	($kind:expr, $T:ident => $body:expr, _ => $fallback:expr) => (
		match $kind {
			Kind::Integers => { type $T = i64; $body }
			Kind::Floats => { type $T = f32; $body }
			Kind::Numbers => { type $T = f64; $body }
			Kind::Shorts => { type $T = i16; $body }
			Kind::Strings => { type $T = String; $body }
			Kind::Values => { type $T = $crate::val::Val; $body }
			_ => $fallback
		}
	);
}

//-------------------------------------------------------------------------------------------------
// construction
//-------------------------------------------------------------------------------------------------

impl Engine {
	pub fn provide_integers(&mut self, items: &[i64]) -> Val {
		self.provide_vec(items.to_vec())
	}

	pub fn provide_floats(&mut self, items: &[f32]) -> Val {
		self.provide_vec(items.to_vec())
	}

	pub fn provide_numbers(&mut self, items: &[f64]) -> Val {
		self.provide_vec(items.to_vec())
	}

	pub fn provide_shorts(&mut self, items: &[i16]) -> Val {
		self.provide_vec(items.to_vec())
	}

	pub fn provide_strings<S: AsRef<str>>(&mut self, items: &[S]) -> Val {
		self.provide_vec(items.iter().map(|s| s.as_ref().to_string()).collect::<Vec<String>>())
	}

	///Makes a pooled generic vector. Each item is incremented.
	pub fn provide_values(&mut self, items: &[Val]) -> Val {
		self.provide_vec(items.to_vec())
	}

	///Makes a plain generic vector, which is destroyed rather than pooled when it's reclaimed.
	pub fn new_values(&mut self, items: &[Val]) -> Val {
		for &item in items {
			self.increment(item);
		}
		self.heap.alloc(Data::Values(items.to_vec()), super::gc::Origin::Plain)
	}

	pub(crate) fn provide_vec<T: Element>(&mut self, items: Vec<T>) -> Val {
		for item in &items {
			item.adopt(self);
		}

		self.heap.provide(T::KIND, |data| {
			if let Some(slot) = T::slot_mut(data) {
				slot.extend(items);
			}
		})
	}

	//---------------------------------------------------------------------------------------------
	// element access
	//---------------------------------------------------------------------------------------------

	pub(crate) fn elements<T: Element>(&self, val: Val) -> EResult<&Vec<T>> {
		let data = self.heap.data(val);
		match T::slot(data) {
			Some(items) => Ok(items),
			None => bail!(
				TypeMismatch,
				"expected {}, received {}",
				T::KIND.a_type_name(),
				data.kind().a_type_name()
			)
		}
	}

	pub(crate) fn elements_mut<T: Element>(&mut self, val: Val) -> EResult<&mut Vec<T>> {
		let kind = self.kind(val);
		match T::slot_mut(self.heap.data_mut(val)) {
			Some(items) => Ok(items),
			None => bail!(
				TypeMismatch,
				"expected {}, received {}",
				T::KIND.a_type_name(),
				kind.a_type_name()
			)
		}
	}

	/**
	Returns the elements of any sequence or set as `Val`s.

	Elements of typed vectors are materialized as temporaries, which are registered with `temps`.
	*/
	pub(crate) fn sequence_values(&mut self, val: Val, temps: &mut Temps) -> EResult<Vec<Val>> {
		let kind = self.kind(val);
		match kind {
			Kind::Values => Ok(self.elements::<Val>(val)?.clone()),
			Kind::List => self.list_values(val),
			Kind::Set => self.set_values(val),
			_ => with_element!(kind, T => {
				let items = self.elements::<T>(val)?.clone();
				Ok(items.iter().map(|item| temps.scratch(item.to_val(self))).collect())
			}, _ => bail!(TypeMismatch, "expected a sequence or a set, received {}", kind.a_type_name()))
		}
	}

	//the elements of any sequence or set which can be converted to T. an element which can't be
	//held by a vector of T can't be a member of one, so it's skipped.
	pub(crate) fn members_as<T: Element>(&mut self, val: Val, temps: &mut Temps) -> EResult<Vec<T>> {
		if let Some(items) = T::slot(self.heap.data(val)) {
			return Ok(items.clone())
		}

		let vals = self.sequence_values(val, temps)?;
		Ok(vals.iter().filter_map(|&item| T::from_val(self, item).ok()).collect())
	}

	//a new cons list, set or generic vector holding `items`
	fn make_like(&mut self, kind: Kind, items: Vec<Val>) -> EResult<Val> {
		match kind {
			Kind::List => Ok(self.provide_list(&items)),
			Kind::Set => self.set_from_values(&items),
			_ => Ok(self.provide_vec(items))
		}
	}

	///The number of elements in a sequence, dictionary or set, or the number of code points in
	///a string.
	pub fn size(&self, val: Val) -> EResult<usize> {
		Ok(match self.heap.data(val) {
			Data::Str(text) => text.chars().count(),
			Data::Integers(items) => items.len(),
			Data::Floats(items) => items.len(),
			Data::Numbers(items) => items.len(),
			Data::Shorts(items) => items.len(),
			Data::Strings(items) => items.len(),
			Data::Values(items) => items.len(),
			Data::List(_) => self.list_len(val)?,
			Data::DictStr(table) | Data::DictNum(table) |
			Data::DictInt(table) | Data::Set(table) => table.len(),
			data => bail!(TypeMismatch, "{} has no size", data.kind().a_type_name())
		})
	}

	/**
	Returns the element at index `i`. Negative indices count back from the end.

	The result is owned by the sequence, or it's a new temporary (for typed vectors and strings).
	Callers which keep it should increment it.
	*/
	pub fn index(&mut self, seq: Val, i: i64) -> EResult<Val> {
		let kind = self.kind(seq);
		with_element!(kind, T => {
			let items = self.elements::<T>(seq)?;
			let item = items[resolve_index(i, items.len())?].clone();
			Ok(item.to_val(self))
		}, _ => match kind {
			Kind::List => self.list_at(seq, i),
			Kind::Str => {
				let chars: Vec<char> = self.as_str(seq)?.chars().collect();
				let c = chars[resolve_index(i, chars.len())?];
				Ok(self.provide_owned_string(c.to_string()))
			}
			_ => bail!(TypeMismatch, "unable to index into {}", kind.a_type_name())
		})
	}

	///Appends an element. Appending to a set inserts into it.
	pub fn append(&mut self, seq: Val, item: Val) -> EResult<Val> {
		let kind = self.kind(seq);
		with_element!(kind, T => {
			let element = T::from_val(self, item)?;
			let seq = self.duplicate_if_shared(seq);
			element.adopt(self);
			self.elements_mut::<T>(seq)?.push(element);
			Ok(seq)
		}, _ => match kind {
			Kind::List => self.list_push_back(seq, item),
			Kind::Set => self.set_insert(seq, item),
			_ => bail!(TypeMismatch, "unable to append to {}", kind.a_type_name())
		})
	}

	pub fn replace(&mut self, seq: Val, i: i64, item: Val) -> EResult<Val> {
		let kind = self.kind(seq);
		with_element!(kind, T => {
			let element = T::from_val(self, item)?;
			let index = resolve_index(i, self.elements::<T>(seq)?.len())?;
			let seq = self.duplicate_if_shared(seq);
			element.adopt(self);
			let old = mem::replace(&mut self.elements_mut::<T>(seq)?[index], element);
			old.abandon(self);
			Ok(seq)
		}, _ => match kind {
			Kind::List => self.list_set(seq, i, item),
			_ => bail!(TypeMismatch, "unable to replace an element of {}", kind.a_type_name())
		})
	}

	///Inserts an element so that it ends up at index `i`. `-1` appends.
	pub fn insert(&mut self, seq: Val, i: i64, item: Val) -> EResult<Val> {
		let kind = self.kind(seq);
		with_element!(kind, T => {
			let element = T::from_val(self, item)?;
			let index = resolve_insertion(i, self.elements::<T>(seq)?.len())?;
			let seq = self.duplicate_if_shared(seq);
			element.adopt(self);
			self.elements_mut::<T>(seq)?.insert(index, element);
			Ok(seq)
		}, _ => match kind {
			Kind::List => self.list_insert(seq, i, item),
			_ => bail!(TypeMismatch, "unable to insert into {}", kind.a_type_name())
		})
	}

	pub fn remove_at(&mut self, seq: Val, i: i64) -> EResult<Val> {
		let kind = self.kind(seq);
		with_element!(kind, T => {
			let index = resolve_index(i, self.elements::<T>(seq)?.len())?;
			let seq = self.duplicate_if_shared(seq);
			let old = self.elements_mut::<T>(seq)?.remove(index);
			old.abandon(self);
			Ok(seq)
		}, _ => match kind {
			Kind::List => self.list_remove_at(seq, i),
			_ => bail!(TypeMismatch, "unable to remove an element from {}", kind.a_type_name())
		})
	}

	///Removes the last element. Returns the sequence which was actually mutated, and the removed
	///element as a temporary.
	pub fn pop(&mut self, seq: Val) -> EResult<(Val, Val)> {
		ensure!(self.size(seq)? > 0, Index, "unable to pop from an empty {}", self.type_name(seq));

		let item = self.index(seq, -1)?;
		self.increment(item);
		let seq = self.remove_at(seq, -1)?;
		self.disown(item);

		Ok((seq, item))
	}

	///The first element of a sequence, or nil when it's empty.
	pub fn car(&mut self, seq: Val) -> EResult<Val> {
		let kind = self.kind(seq);
		match kind {
			Kind::List => self.list_car(seq),
			_ if kind.is_vector() => {
				if self.size(seq)? == 0 {
					Ok(self.nil())
				} else {
					self.index(seq, 0)
				}
			}
			_ => bail!(TypeMismatch, "expected a sequence, received {}", kind.a_type_name())
		}
	}

	/**
	Every element of a sequence except the first, or nil when there's at most one element.

	For cons lists, the result shares the original's nodes. For vectors, it's a copy.
	*/
	pub fn cdr(&mut self, seq: Val) -> EResult<Val> {
		let kind = self.kind(seq);
		match kind {
			Kind::List => self.list_cdr(seq),
			_ if kind.is_vector() => {
				if self.size(seq)? <= 1 {
					Ok(self.nil())
				} else {
					self.extract(seq, &SliceBound::Index(1), None)
				}
			}
			_ => bail!(TypeMismatch, "expected a sequence, received {}", kind.a_type_name())
		}
	}

	//---------------------------------------------------------------------------------------------
	// sorting
	//---------------------------------------------------------------------------------------------

	/**
	Sorts a sequence using `comp` as a strict "less than" predicate.

	`comp(a, a)` must return false, otherwise a contract error is raised before anything is
	reordered. If `comp` fails, the sequence is left untouched. Returns the sequence which was
	actually sorted, which is a copy when `seq` is shared.
	*/
	pub fn sort<F>(&mut self, seq: Val, mut comp: F) -> EResult<Val>
	where
		F: FnMut(&mut Engine, Val, Val) -> EResult<bool>
	{
		let kind = self.kind(seq);
		ensure!(kind.is_sequence(), TypeMismatch, "unable to sort {}", kind.a_type_name());

		self.scoped(|engine, temps| {
			let target = engine.duplicate_if_shared(seq);
			if target != seq {
				temps.hold(target);
			}

			match kind {
				Kind::List => {
					let chain = engine.list_chain(target)?;
					let mut values: Vec<Val> = chain.nodes.iter().map(|&id| engine.nodes.value(id)).collect();
					seq::quicksort(&mut values, &mut |a: &Val, b: &Val| comp(engine, *a, *b))?;
					engine.write_chain_values(&chain, &values);
				}
				Kind::Values => {
					let mut values = engine.elements::<Val>(target)?.clone();
					seq::quicksort(&mut values, &mut |a: &Val, b: &Val| comp(engine, *a, *b))?;
					*engine.elements_mut::<Val>(target)? = values;
				}
				_ => with_element!(kind, T => {
					let items = engine.elements::<T>(target)?.clone();
					let mut pairs: Vec<(T, Val)> = items.into_iter().map(|item| {
						let val = temps.scratch(item.to_val(engine));
						(item, val)
					}).collect();

					seq::quicksort(&mut pairs, &mut |a: &(T, Val), b: &(T, Val)| comp(engine, a.1, b.1))?;
					*engine.elements_mut::<T>(target)? = pairs.into_iter().map(|(item, _)| item).collect();
				}, _ => ())
			}

			Ok(target)
		})
	}

	///Sorts a sequence by the natural ordering (see [`less`](#method.less)).
	pub fn sort_natural(&mut self, seq: Val, descending: bool) -> EResult<Val> {
		let kind = self.kind(seq);
		if !(kind.is_numeric_vector() || kind == Kind::Strings) {
			return self.sort(seq, move |engine, a, b| {
				if descending {
					engine.less(b, a)
				} else {
					engine.less(a, b)
				}
			})
		}

		self.scoped(|engine, temps| {
			let target = engine.duplicate_if_shared(seq);
			if target != seq {
				temps.hold(target);
			}

			with_element!(kind, T => {
				let mut items = engine.elements::<T>(target)?.clone();
				seq::quicksort(&mut items, &mut |a: &T, b: &T| {
					if descending {
						T::natural_less(engine, b, a)
					} else {
						T::natural_less(engine, a, b)
					}
				})?;
				*engine.elements_mut::<T>(target)? = items;
			}, _ => ());

			Ok(target)
		})
	}

	//---------------------------------------------------------------------------------------------
	// search
	//---------------------------------------------------------------------------------------------

	///The index of every element equal to `item`. For a string, the index of every occurrence
	///of the substring `item`.
	pub fn find_all(&self, seq: Val, item: Val) -> EResult<Vec<usize>> {
		let kind = self.kind(seq);
		with_element!(kind, T => {
			let items = self.elements::<T>(seq)?;
			Ok(seq::find_all(items, |element| element.matches(self, item)))
		}, _ => match kind {
			Kind::List => {
				let values = self.list_values(seq)?;
				Ok(seq::find_all(&values, |&element| self.equal(element, item)))
			}
			Kind::Str => {
				let hay: Vec<char> = self.as_str(seq)?.chars().collect();
				let needle = self.as_str(item)?;
				Ok((0 .. hay.len()).filter(|&at| hay.match_at(needle, at).is_some()).collect())
			}
			_ => bail!(TypeMismatch, "unable to search {}", kind.a_type_name())
		})
	}

	pub fn find(&self, seq: Val, item: Val) -> EResult<Option<usize>> {
		Ok(self.find_all(seq, item)?.first().copied())
	}

	pub fn rfind(&self, seq: Val, item: Val) -> EResult<Option<usize>> {
		Ok(self.find_all(seq, item)?.last().copied())
	}

	pub fn count_of(&self, seq: Val, item: Val) -> EResult<usize> {
		Ok(self.find_all(seq, item)?.len())
	}

	///Returns `true` if a sequence has an element equal to `item`, or if a string contains the
	///substring `item`, or if a set or dictionary has the key `item`.
	pub fn contains(&self, seq: Val, item: Val) -> EResult<bool> {
		let kind = self.kind(seq);
		if kind.is_dict() || kind == Kind::Set {
			Ok(self.lookup(seq, item)?.is_some())
		} else {
			Ok(self.find(seq, item)?.is_some())
		}
	}

	///Replaces every element equal to `old` with `new`. For a string, returns a new string with
	///every occurrence of the substring `old` replaced.
	pub fn replace_all(&mut self, seq: Val, old: Val, new: Val) -> EResult<Val> {
		if self.kind(seq) == Kind::Str {
			let replaced = self.as_str(seq)?.replace(self.as_str(old)?, self.as_str(new)?);
			return Ok(self.provide_owned_string(replaced))
		}

		let mut target = seq;
		for i in self.find_all(seq, old)? {
			target = self.replace(target, i as i64, new)?;
		}

		Ok(target)
	}

	//---------------------------------------------------------------------------------------------
	// set algebra
	//---------------------------------------------------------------------------------------------

	///The elements of `left` which are also in `right`, without duplicates. The result has the
	///same kind as `left`; elements of `right` which a vector of that kind can't hold are left out
	///of every set operation.
	pub fn and(&mut self, left: Val, right: Val) -> EResult<Val> {
		self.set_algebra(SetOp::And, left, right)
	}

	///The elements of `left` followed by the elements of `right`, without duplicates.
	pub fn or(&mut self, left: Val, right: Val) -> EResult<Val> {
		self.set_algebra(SetOp::Or, left, right)
	}

	///The elements which are in exactly one of `left` and `right`.
	pub fn xor(&mut self, left: Val, right: Val) -> EResult<Val> {
		self.set_algebra(SetOp::Xor, left, right)
	}

	fn set_algebra(&mut self, op: SetOp, left: Val, right: Val) -> EResult<Val> {
		let (left_kind, right_kind) = (self.kind(left), self.kind(right));
		for kind in [left_kind, right_kind] {
			ensure!(
				kind.is_sequence() || kind == Kind::Set,
				TypeMismatch,
				"set operations expect a sequence or a set, received {}",
				kind.a_type_name()
			);
		}

		self.scoped(|engine, temps| {
			with_element!(left_kind, T => {
				let l = engine.members_as::<T>(left, temps)?;
				let r = engine.members_as::<T>(right, temps)?;
				let out = seq::set_op(op, &l, &r, |a, b| T::same(engine, a, b));
				Ok(engine.provide_vec(out))
			}, _ => {
				let l = engine.sequence_values(left, temps)?;
				let r = engine.sequence_values(right, temps)?;
				let out = seq::set_op(op, &l, &r, |a, b| engine.equal(*a, *b));
				engine.make_like(left_kind, out)
			})
		})
	}

	///Removes duplicate elements, keeping the first occurrence of each. Returns a new sequence.
	pub fn unique(&mut self, seq: Val) -> EResult<Val> {
		let kind = self.kind(seq);
		with_element!(kind, T => {
			let items = self.elements::<T>(seq)?;
			let out = seq::unique(items, |a, b| T::same(self, a, b));
			Ok(self.provide_vec(out))
		}, _ => match kind {
			Kind::List => {
				let values = self.list_values(seq)?;
				let out = seq::unique(&values, |a, b| self.equal(*a, *b));
				Ok(self.provide_list(&out))
			}
			_ => bail!(TypeMismatch, "expected a sequence, received {}", kind.a_type_name())
		})
	}

	//---------------------------------------------------------------------------------------------
	// slicing, rotation, reversal
	//---------------------------------------------------------------------------------------------

	/**
	Returns a new sequence (or string) holding the elements from `from` up to `to`, or up to the
	end when `to` is `None`.

	Index bounds are clamped, so they never fail. Anchor bounds search strings by substring, and
	string vectors and generic sequences by string element; an anchor which isn't found produces
	an empty result. Anchors on numeric vectors are malformed bounds (an index error).
	*/
	pub fn extract(&mut self, seq: Val, from: &SliceBound, to: Option<&SliceBound>) -> EResult<Val> {
		let kind = self.kind(seq);
		match kind {
			Kind::Str => {
				let chars: Vec<char> = self.as_str(seq)?.chars().collect();
				let text: String = match resolve_slice(Some(&chars[..]), chars.len(), from, to)? {
					Some(range) => chars[range].iter().collect(),
					None => String::new()
				};
				Ok(self.provide_owned_string(text))
			}
			Kind::Strings => {
				let items = self.elements::<String>(seq)?;
				let hay: Vec<Option<&str>> = items.iter().map(|s| Some(s.as_str())).collect();
				let out = match resolve_slice(Some(&hay[..]), items.len(), from, to)? {
					Some(range) => items[range].to_vec(),
					None => Vec::new()
				};
				Ok(self.provide_vec(out))
			}
			Kind::Values | Kind::List => {
				let values = if kind == Kind::List {
					self.list_values(seq)?
				} else {
					self.elements::<Val>(seq)?.clone()
				};

				let hay: Vec<Option<&str>> = values.iter().map(|&val| {
					match self.heap.data(val) {
						Data::Str(text) => Some(text.as_str()),
						_ => None
					}
				}).collect();

				let out = match resolve_slice(Some(&hay[..]), values.len(), from, to)? {
					Some(range) => values[range].to_vec(),
					None => Vec::new()
				};

				if kind == Kind::List {
					Ok(self.provide_list(&out))
				} else {
					Ok(self.provide_vec(out))
				}
			}
			_ => with_element!(kind, T => {
				let items = self.elements::<T>(seq)?;
				let out = match resolve_slice::<[char]>(None, items.len(), from, to)? {
					Some(range) => items[range].to_vec(),
					None => Vec::new()
				};
				Ok(self.provide_vec(out))
			}, _ => bail!(TypeMismatch, "unable to extract from {}", kind.a_type_name()))
		}
	}

	///A convenience wrapper for [`extract`](#method.extract) which parses textual anchors, as
	///described by [`Anchor::parse`](struct.Anchor.html#method.parse).
	pub fn extract_between(&mut self, seq: Val, from: &str, to: Option<&str>) -> EResult<Val> {
		let from = SliceBound::Anchor(Anchor::parse(from));
		let to = to.map(|to| SliceBound::Anchor(Anchor::parse(to)));
		self.extract(seq, &from, to.as_ref())
	}

	///Rotates by one position. When `right` is true the last element moves to the front,
	///otherwise the first element moves to the back.
	pub fn rotate(&mut self, seq: Val, right: bool) -> EResult<Val> {
		let kind = self.kind(seq);
		ensure!(kind.is_sequence(), TypeMismatch, "unable to rotate {}", kind.a_type_name());

		let target = self.duplicate_if_shared(seq);
		with_element!(kind, T => {
			seq::rotate(self.elements_mut::<T>(target)?, right);
		}, _ => {
			let chain = self.list_chain(target)?;
			let mut values: Vec<Val> = chain.nodes.iter().map(|&id| self.nodes.value(id)).collect();
			seq::rotate(&mut values, right);
			self.write_chain_values(&chain, &values);
		});

		Ok(target)
	}

	/**
	Reverses a sequence, or the code points of a string.

	With `duplicate`, a reversed copy is returned and `seq` is untouched. Otherwise a vector is
	reversed in place (or on a copy, when it's shared), and a cons list is reversed in place;
	see [`list_reverse`](#method.list_reverse). Strings always produce a new string.
	*/
	pub fn reverse(&mut self, seq: Val, duplicate: bool) -> EResult<Val> {
		let kind = self.kind(seq);
		match kind {
			Kind::Str => {
				let reversed: String = self.as_str(seq)?.chars().rev().collect();
				Ok(self.provide_owned_string(reversed))
			}
			Kind::List => self.list_reverse(seq, duplicate),
			_ => with_element!(kind, T => {
				if duplicate {
					let mut items = self.elements::<T>(seq)?.clone();
					items.reverse();
					Ok(self.provide_vec(items))
				} else {
					let target = self.duplicate_if_shared(seq);
					self.elements_mut::<T>(target)?.reverse();
					Ok(target)
				}
			}, _ => bail!(TypeMismatch, "unable to reverse {}", kind.a_type_name()))
		}
	}
}
