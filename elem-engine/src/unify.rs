use super::engine::{Engine, Sym};
use super::error::EResult;
use super::gc::Temps;
use super::val::{Data, Kind, Scalar, Val};
use fnv::FnvHashSet;

/*

equality and unification walk through containers using a stack of (a, b) pairs which are still
to be compared, so deep nesting doesn't grow the native stack. they also need to cope with
self-reference. rather than flagging each container while it's being visited, we keep the set
of container pairs which have already been taken apart. meeting the same pair again means that
we've gone around a cycle (or reached a shared part twice), and we assume that the pair is
equal: if any other part of the structure differs, that difference will still be found.

*/

//an element of a sequence: either a Val, or an unboxed element of a typed vector
#[derive(Copy, Clone)]
enum Item<'a> {
	Val(Val),
	Leaf(Scalar<'a>)
}

type Assumed = FnvHashSet<(Val, Val)>;

impl Engine {
	fn vector_items(&self, val: Val) -> Option<Vec<Item<'_>>> {
		Some(match self.heap.data(val) {
			Data::Integers(items) => items.iter().map(|&i| Item::Leaf(Scalar::Int(i))).collect(),
			Data::Shorts(items) => items.iter().map(|&s| Item::Leaf(Scalar::Int(s as i64))).collect(),
			Data::Floats(items) => items.iter().map(|&f| Item::Leaf(Scalar::Num(f as f64))).collect(),
			Data::Numbers(items) => items.iter().map(|&n| Item::Leaf(Scalar::Num(n))).collect(),
			Data::Strings(items) => items.iter().map(|s| Item::Leaf(Scalar::Text(s))).collect(),
			Data::Values(items) => items.iter().map(|&v| Item::Val(v)).collect(),
			_ => return None
		})
	}

	fn leaves_equal(&self, a: Val, b: Val) -> bool {
		match (self.heap.data(a), self.heap.data(b)) {
			(Data::Nil, Data::Nil) => true,
			(Data::Bool(x), Data::Bool(y)) => x == y,
			_ => match (self.scalar(a), self.scalar(b)) {
				(Some(x), Some(y)) => x.same(y),
				_ => false
			}
		}
	}

	/**
	Deep structural equality.

	Numbers of any width compare numerically. Vectors of any kind compare element-wise with one
	another; cons lists compare with cons lists, including the shape of their cycles.
	Dictionaries and sets compare by kind, key set and values.
	*/
	pub fn equal(&self, a: Val, b: Val) -> bool {
		let mut assumed = Assumed::default();
		let mut pending = vec![(Item::Val(a), Item::Val(b))];

		while let Some(pair) = pending.pop() {
			let same = match pair {
				(Item::Val(a), Item::Val(b)) => self.equal_step(a, b, &mut assumed, &mut pending),
				(Item::Leaf(x), Item::Val(v)) | (Item::Val(v), Item::Leaf(x)) => {
					self.scalar(v).map_or(false, |y| x.same(y))
				}
				(Item::Leaf(x), Item::Leaf(y)) => x.same(y)
			};

			if !same {
				return false
			}
		}

		true
	}

	//compares the shape of a and b, pushing their element pairs onto `pending`
	fn equal_step<'a>(
		&'a self,
		a: Val,
		b: Val,
		assumed: &mut Assumed,
		pending: &mut Vec<(Item<'a>, Item<'a>)>
	) -> bool {
		if a == b {
			return true
		}

		let (ka, kb) = (self.kind(a), self.kind(b));
		if ka.is_leaf() || kb.is_leaf() {
			return ka.is_leaf() && kb.is_leaf() && self.leaves_equal(a, b)
		}

		if !assumed.insert((a, b)) {
			return true
		}

		match (ka, kb) {
			(Kind::List, Kind::List) => {
				let (ca, cb) = match (self.list_chain(a), self.list_chain(b)) {
					(Ok(ca), Ok(cb)) => (ca, cb),
					_ => return false
				};

				if ca.len() != cb.len() || ca.cycle != cb.cycle {
					return false
				}

				pending.extend(ca.nodes.iter().zip(&cb.nodes).map(|(&x, &y)| {
					(Item::Val(self.nodes.value(x)), Item::Val(self.nodes.value(y)))
				}));
				true
			}
			_ if ka.is_vector() && kb.is_vector() => {
				match (self.vector_items(a), self.vector_items(b)) {
					(Some(xs), Some(ys)) if xs.len() == ys.len() => {
						pending.extend(xs.into_iter().zip(ys));
						true
					}
					_ => false
				}
			}
			_ if ka == kb => {
				match (self.heap.data(a).table(), self.heap.data(b).table()) {
					(Some(ta), Some(tb)) if ta.len() == tb.len() => {
						for (key, &va) in ta.iter() {
							match tb.get(key) {
								Some(_) if ka == Kind::Set => (),
								Some(&vb) => pending.push((Item::Val(va), Item::Val(vb))),
								None => return false
							}
						}
						true
					}
					_ => false
				}
			}
			_ => false
		}
	}

	///Identity for containers, and value equality for leaves.
	pub fn egal(&self, a: Val, b: Val) -> bool {
		a == b || (self.kind(a).is_leaf() && self.kind(b).is_leaf() && self.leaves_equal(a, b))
	}

	//---------------------------------------------------------------------------------------------
	// unification
	//---------------------------------------------------------------------------------------------

	fn is_atom_named(&self, val: Val, name: &str) -> bool {
		match self.heap.data(val) {
			Data::Atom(sym) => self.sym_name(*sym) == name,
			_ => false
		}
	}

	/**
	Matches `value` against `pattern`.

	Atoms in the pattern are variables, and `_` matches anything. Within a sequence pattern, `$`
	followed by a variable matches the rest of the sequence. Dictionary and set patterns require
	every key in the pattern to be present in `value`, with unifying values. Any other leaf in
	the pattern must be [`equal`](#method.equal) to the corresponding part of `value`.

	When `bindings` is given, each variable is bound to the value it matched, and a variable
	which is already bound only matches a value which is equal to its binding. On failure, any
	bindings made by this call are removed again.
	*/
	pub fn unify(&mut self, pattern: Val, value: Val, mut bindings: Option<&mut Bindings>) -> EResult<bool> {
		let mark = bindings.as_ref().map_or(0, |bindings| bindings.len());
		let result = self.scoped(|engine, temps| {
			let mut assumed = Assumed::default();
			let mut pending = vec![(pattern, value)];

			while let Some((pattern, value)) = pending.pop() {
				if !engine.unify_step(pattern, value, &mut bindings, temps, &mut assumed, &mut pending)? {
					return Ok(false)
				}
			}

			Ok(true)
		});

		if !matches!(result, Ok(true)) {
			if let Some(bindings) = bindings {
				bindings.truncate(self, mark);
			}
		}

		result
	}

	//matches one pattern against one value. the pairs that must also match are pushed onto
	//`pending`, last first, so that variables bind from left to right.
	fn unify_step(
		&mut self,
		pattern: Val,
		value: Val,
		bindings: &mut Option<&mut Bindings>,
		temps: &mut Temps,
		assumed: &mut Assumed,
		pending: &mut Vec<(Val, Val)>
	) -> EResult<bool> {
		let kind = self.kind(pattern);
		if kind == Kind::Atom {
			let sym = self.as_sym(pattern)?;
			if self.sym_name(sym) == "_" {
				return Ok(true)
			}

			if let Some(bindings) = bindings.as_deref_mut() {
				if let Some(bound) = bindings.get(sym) {
					return Ok(self.equal(bound, value))
				}
				bindings.bind(self, sym, value);
			}

			return Ok(true)
		}

		if kind.is_leaf() || kind.is_numeric_vector() || kind == Kind::Strings {
			return Ok(self.equal(pattern, value))
		}

		if !assumed.insert((pattern, value)) {
			return Ok(true)
		}

		let value_kind = self.kind(value);
		let mut pairs = Vec::new();
		match kind {
			Kind::List | Kind::Values => {
				if !value_kind.is_sequence() {
					return Ok(false)
				}

				let patterns = match kind {
					Kind::List => self.list_values(pattern)?,
					_ => self.elements::<Val>(pattern)?.clone()
				};
				let values = self.sequence_values(value, temps)?;

				let mut rest_matched = false;
				for (i, &item) in patterns.iter().enumerate() {
					if self.is_atom_named(item, "$") {
						if let Some(&var) = patterns.get(i + 1) {
							let rest = &values[i.min(values.len()) ..];
							let rest = match value_kind {
								Kind::List => self.provide_list(rest),
								_ => self.provide_values(rest)
							};
							pairs.push((var, temps.scratch(rest)));
						}

						rest_matched = true;
						break
					}

					if i >= values.len() {
						return Ok(false)
					}
					pairs.push((item, values[i]));
				}

				if !rest_matched && patterns.len() != values.len() {
					return Ok(false)
				}
			}
			_ => {
				if kind != value_kind {
					return Ok(false)
				}

				for (key, item) in self.sorted_entries(pattern)? {
					let found = self.heap.data(value).table().and_then(|table| table.get(&key).copied());
					match found {
						Some(_) if kind == Kind::Set => (),
						Some(found) => pairs.push((item, found)),
						None => return Ok(false)
					}
				}
			}
		}

		pending.extend(pairs.into_iter().rev());
		Ok(true)
	}
}

/**
The variables bound by [`Engine::unify`](struct.Engine.html#method.unify).

Each bound value is incremented. Call [`release`](#method.release) to give them up.
*/
#[derive(Debug, Default)]
pub struct Bindings {
	entries: Vec<(Sym, Val)>
}

impl Bindings {
	pub fn new() -> Bindings {
		Bindings::default()
	}

	pub fn get(&self, sym: Sym) -> Option<Val> {
		self.entries.iter().find(|(bound, _)| *bound == sym).map(|&(_, val)| val)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (Sym, Val)> + '_ {
		self.entries.iter().copied()
	}

	fn bind(&mut self, engine: &mut Engine, sym: Sym, val: Val) {
		engine.increment(val);
		self.entries.push((sym, val));
	}

	fn truncate(&mut self, engine: &mut Engine, len: usize) {
		for (_, val) in self.entries.drain(len ..) {
			engine.decrement(val);
		}
	}

	pub fn release(mut self, engine: &mut Engine) {
		self.truncate(engine, 0);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn equality_is_cycle_safe() {
		let mut engine = Engine::new();
		let one = engine.provide_integer(1);

		let a = engine.provide_list(&[one, one]);
		engine.list_link_tail(a, 0).unwrap();
		let b = engine.provide_list(&[one, one]);
		engine.list_link_tail(b, 0).unwrap();
		assert!(engine.equal(a, b));

		let c = engine.provide_list(&[one, one]);
		engine.list_link_tail(c, 1).unwrap();
		assert!(!engine.equal(a, c));
	}

	#[test]
	fn vectors_of_different_kinds_compare_numerically() {
		let mut engine = Engine::new();
		let ints = engine.provide_integers(&[1, 2]);
		let floats = engine.provide_floats(&[1.0, 2.0]);
		let one = engine.provide_number(1.0);
		let two = engine.provide_short(2);
		let values = engine.provide_values(&[one, two]);

		assert!(engine.equal(ints, floats));
		assert!(engine.equal(floats, values));
		assert!(!engine.egal(ints, floats));
	}

	#[test]
	fn failed_unification_unbinds() {
		let mut engine = Engine::new();
		let x = engine.atom("x");
		let one = engine.provide_integer(1);
		let two = engine.provide_integer(2);
		let pattern = engine.provide_list(&[x, x]);
		let value = engine.provide_list(&[one, two]);

		let mut bindings = Bindings::new();
		assert!(!engine.unify(pattern, value, Some(&mut bindings)).unwrap());
		assert!(bindings.is_empty());
		assert!(engine.unify(pattern, value, None).unwrap());
		bindings.release(&mut engine);
	}
}
