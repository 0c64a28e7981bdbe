use super::assoc::Table;
use super::engine::{Engine, Sym};
use super::error::EResult;
use super::gc::Origin;
use super::list::NodeId;
use std::cmp::Ordering;
use std::fmt::{self, Debug, Formatter};

//-------------------------------------------------------------------------------------------------
// Val
//-------------------------------------------------------------------------------------------------

/**
A handle to a value stored in an [`Engine`](struct.Engine.html).

`Val` is a small `Copy` type. It doesn't own its value: ownership is tracked separately by the
value's [`Status`](struct.Status.html) word, through
[`increment`](struct.Engine.html#method.increment) and
[`decrement`](struct.Engine.html#method.decrement).

A `Val` records the id of the engine which created it. Passing it to any other engine panics,
and so does using it after its value has been reclaimed.
*/

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Val {
	pub(crate) index: u32,
	pub(crate) engine: u32
}

impl Debug for Val {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "Val({}#{})", self.engine, self.index)
	}
}

//-------------------------------------------------------------------------------------------------
// Kind, Data
//-------------------------------------------------------------------------------------------------

/*

Data is the closed tagged union of payloads. every Kind has exactly one Data variant with the
same name, so that the two enums can be generated together. the payload types must all implement
Default: a pool miss allocates Data::empty(kind) and lets the constructor fill it in.

*/

macro_rules! impl_kinds {
	($(($variant:ident, $payload:ty, $type_name:literal, $a_type_name:literal)),+) => (
		/**
		The concrete type of a value.

		Every value has exactly one `Kind`, which never changes over its lifetime.
		*/

		#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
		pub enum Kind {
			Nil,
			$($variant),+
		}

		pub(crate) const KIND_COUNT: usize = [Kind::Nil, $(Kind::$variant),+].len();

		impl Kind {
			pub const ALL: [Kind; KIND_COUNT] = [Kind::Nil, $(Kind::$variant),+];

			///Returns the name of this kind, such as `"nil"` or `"integers"`.
			pub fn type_name(self) -> &'static str {
				match self {
					Kind::Nil => "nil",
					$(Kind::$variant => $type_name),+
				}
			}

			/**
			Returns the name of this kind, prefixed with the indefinite article, such as
			`"an integer"` or `"a list"`.

				bail!(TypeMismatch, "expected a set, received {}", kind.a_type_name())
			*/
			pub fn a_type_name(self) -> &'static str {
				match self {
					Kind::Nil => "nil",
					$(Kind::$variant => $a_type_name),+
				}
			}
		}

		pub(crate) enum Data {
			Nil,
			$($variant($payload)),+
		}

		impl Data {
			#[inline]
			pub(crate) fn kind(&self) -> Kind {
				match *self {
					Data::Nil => Kind::Nil,
					$(Data::$variant(_) => Kind::$variant),+
				}
			}

			pub(crate) fn empty(kind: Kind) -> Data {
				match kind {
					Kind::Nil => Data::Nil,
					$(Kind::$variant => Data::$variant(<$payload>::default())),+
				}
			}
		}
	);
}

impl_kinds!(
	(Bool, bool, "bool", "a bool"),
	(Number, f64, "number", "a number"),
	(Integer, i64, "integer", "an integer"),
	(Float, f32, "float", "a float"),
	(Short, i16, "short", "a short"),
	(Str, String, "string", "a string"),
	(Atom, Sym, "atom", "an atom"),
	(Integers, Vec<i64>, "integers", "an integers vector"),
	(Floats, Vec<f32>, "floats", "a floats vector"),
	(Numbers, Vec<f64>, "numbers", "a numbers vector"),
	(Shorts, Vec<i16>, "shorts", "a shorts vector"),
	(Strings, Vec<String>, "strings", "a strings vector"),
	(Values, Vec<Val>, "values", "a values vector"),
	(List, Option<NodeId>, "list", "a list"),
	(DictStr, Table, "dictionary", "a dictionary"),
	(DictNum, Table, "dictionary_n", "a number-keyed dictionary"),
	(DictInt, Table, "dictionary_i", "an integer-keyed dictionary"),
	(Set, Table, "set", "a set")
);

impl Kind {
	///Nil, bools, numbers of every width, strings and atoms.
	pub fn is_leaf(self) -> bool {
		self <= Kind::Atom
	}

	pub fn is_numeric(self) -> bool {
		matches!(self, Kind::Number | Kind::Integer | Kind::Float | Kind::Short)
	}

	///The homogeneous and generic vectors.
	pub fn is_vector(self) -> bool {
		matches!(
			self,
			Kind::Integers | Kind::Floats | Kind::Numbers |
			Kind::Shorts | Kind::Strings | Kind::Values
		)
	}

	pub fn is_numeric_vector(self) -> bool {
		matches!(self, Kind::Integers | Kind::Floats | Kind::Numbers | Kind::Shorts)
	}

	///Vectors and cons lists.
	pub fn is_sequence(self) -> bool {
		self.is_vector() || self == Kind::List
	}

	pub fn is_dict(self) -> bool {
		matches!(self, Kind::DictStr | Kind::DictNum | Kind::DictInt)
	}

	///Anything which can hold other values, or more than one element.
	pub fn is_container(self) -> bool {
		!self.is_leaf()
	}
}

impl Data {
	//empties a payload before it's pooled. leaves are overwritten wholesale by the next
	//constructor, but buffers keep their capacity.
	pub(crate) fn clear(&mut self) {
		match self {
			Data::Str(s) => s.clear(),
			Data::Integers(v) => v.clear(),
			Data::Floats(v) => v.clear(),
			Data::Numbers(v) => v.clear(),
			Data::Shorts(v) => v.clear(),
			Data::Strings(v) => v.clear(),
			Data::Values(v) => v.clear(),
			Data::List(first) => *first = None,
			Data::DictStr(t) | Data::DictNum(t) | Data::DictInt(t) | Data::Set(t) => t.clear(),
			Data::Nil | Data::Bool(_) | Data::Number(_) | Data::Integer(_) |
			Data::Float(_) | Data::Short(_) | Data::Atom(_) => ()
		}
	}

	pub(crate) fn table(&self) -> Option<&Table> {
		match self {
			Data::DictStr(t) | Data::DictNum(t) | Data::DictInt(t) | Data::Set(t) => Some(t),
			_ => None
		}
	}

	pub(crate) fn table_mut(&mut self) -> Option<&mut Table> {
		match self {
			Data::DictStr(t) | Data::DictNum(t) | Data::DictInt(t) | Data::Set(t) => Some(t),
			_ => None
		}
	}
}

//-------------------------------------------------------------------------------------------------
// Scalar
//-------------------------------------------------------------------------------------------------

//a borrowed view of a leaf which can be compared against other leaves, regardless of width
#[derive(Copy, Clone, PartialEq, Debug)]
pub(crate) enum Scalar<'a> {
	Int(i64),
	Num(f64),
	Text(&'a str),
	Atom(&'a str)
}

impl<'a> Scalar<'a> {
	pub(crate) fn same(self, other: Scalar) -> bool {
		match (self, other) {
			(Scalar::Int(a), Scalar::Int(b)) => a == b,
			(Scalar::Int(a), Scalar::Num(b)) | (Scalar::Num(b), Scalar::Int(a)) => a as f64 == b,
			(Scalar::Num(a), Scalar::Num(b)) => a == b,
			(Scalar::Text(a), Scalar::Text(b)) => a == b,
			(Scalar::Atom(a), Scalar::Atom(b)) => a == b,
			_ => false
		}
	}

	pub(crate) fn order(self, other: Scalar) -> Option<Ordering> {
		match (self, other) {
			(Scalar::Int(a), Scalar::Int(b)) => Some(a.cmp(&b)),
			(Scalar::Int(a), Scalar::Num(b)) => (a as f64).partial_cmp(&b),
			(Scalar::Num(a), Scalar::Int(b)) => a.partial_cmp(&(b as f64)),
			(Scalar::Num(a), Scalar::Num(b)) => a.partial_cmp(&b),
			(Scalar::Text(a), Scalar::Text(b)) => Some(a.cmp(b)),
			(Scalar::Atom(a), Scalar::Atom(b)) => Some(a.cmp(b)),
			_ => None
		}
	}
}

//-------------------------------------------------------------------------------------------------
// leaf constructors
//-------------------------------------------------------------------------------------------------

/*

each leaf kind has two constructors. provide_* takes an instance from the kind's pool when one is
available; new_* always allocates a plain instance, which is destroyed rather than pooled when
it's reclaimed. both return a temporary (status 0).

*/

macro_rules! leaf_constructors {
	($(($provide:ident, $new:ident, $kind:ident, $t:ty)),+) => (
		impl Engine {
			$(
				pub fn $provide(&mut self, value: $t) -> Val {
					self.heap.provide(Kind::$kind, |data| *data = Data::$kind(value))
				}

				pub fn $new(&mut self, value: $t) -> Val {
					self.heap.alloc(Data::$kind(value), Origin::Plain)
				}
			)+
		}
	);
}

leaf_constructors!(
	(provide_number, new_number, Number, f64),
	(provide_integer, new_integer, Integer, i64),
	(provide_float, new_float, Float, f32),
	(provide_short, new_short, Short, i16)
);

impl Engine {
	pub fn provide_string(&mut self, text: &str) -> Val {
		self.heap.provide(Kind::Str, |data| {
			if let Data::Str(buf) = data {
				buf.push_str(text);
			}
		})
	}

	pub fn new_string(&mut self, text: &str) -> Val {
		self.heap.alloc(Data::Str(text.to_string()), Origin::Plain)
	}

	pub(crate) fn provide_owned_string(&mut self, text: String) -> Val {
		self.heap.provide(Kind::Str, move |data| {
			if let Data::Str(buf) = data {
				if buf.capacity() >= text.len() {
					buf.push_str(&text);
				} else {
					*buf = text;
				}
			}
		})
	}

	///Returns the cached constant for a small integer literal, or a pooled integer when `n`
	///falls outside the cache configured by
	///[`EngineBuilder::small_int_cache`](struct.EngineBuilder.html#method.small_int_cache).
	pub fn int_literal(&mut self, n: i64) -> Val {
		let offset = n.wrapping_sub(self.consts.small_base);
		if n >= self.consts.small_base && (offset as u64) < self.consts.small_ints.len() as u64 {
			self.consts.small_ints[offset as usize]
		} else {
			self.provide_integer(n)
		}
	}

	//---------------------------------------------------------------------------------------------
	// kinds and predicates
	//---------------------------------------------------------------------------------------------

	#[inline]
	pub fn kind(&self, val: Val) -> Kind {
		self.heap.data(val).kind()
	}

	pub fn type_name(&self, val: Val) -> &'static str {
		self.kind(val).type_name()
	}

	pub fn a_type_name(&self, val: Val) -> &'static str {
		self.kind(val).a_type_name()
	}

	pub fn is_nil(&self, val: Val) -> bool {
		self.kind(val) == Kind::Nil
	}

	///Returns `false` for nil and `false`, and `true` for everything else.
	pub fn is_truthy(&self, val: Val) -> bool {
		!matches!(self.heap.data(val), Data::Nil | Data::Bool(false))
	}

	///Any numeric leaf, of any width.
	pub fn is_number(&self, val: Val) -> bool {
		self.kind(val).is_numeric()
	}

	pub fn is_string(&self, val: Val) -> bool {
		self.kind(val) == Kind::Str
	}

	pub fn is_atom(&self, val: Val) -> bool {
		self.kind(val) == Kind::Atom
	}

	///Any vector or cons list.
	pub fn is_list(&self, val: Val) -> bool {
		self.kind(val).is_sequence()
	}

	pub fn is_cons(&self, val: Val) -> bool {
		self.kind(val) == Kind::List
	}

	pub fn is_dict(&self, val: Val) -> bool {
		self.kind(val).is_dict()
	}

	pub fn is_set(&self, val: Val) -> bool {
		self.kind(val) == Kind::Set
	}

	pub fn is_container(&self, val: Val) -> bool {
		self.kind(val).is_container()
	}

	//---------------------------------------------------------------------------------------------
	// conversions
	//---------------------------------------------------------------------------------------------

	///Converts a numeric leaf of any width to `f64`.
	pub fn as_number(&self, val: Val) -> EResult<f64> {
		match *self.heap.data(val) {
			Data::Number(n) => Ok(n),
			Data::Integer(i) => Ok(i as f64),
			Data::Float(f) => Ok(f as f64),
			Data::Short(s) => Ok(s as f64),
			ref data => bail!(TypeMismatch, "expected a number, received {}", data.kind().a_type_name())
		}
	}

	///Converts a numeric leaf of any width to `i64`. Floating-point values are truncated.
	pub fn as_integer(&self, val: Val) -> EResult<i64> {
		match *self.heap.data(val) {
			Data::Integer(i) => Ok(i),
			Data::Short(s) => Ok(s as i64),
			Data::Number(n) => Ok(n as i64),
			Data::Float(f) => Ok(f as i64),
			ref data => bail!(TypeMismatch, "expected a number, received {}", data.kind().a_type_name())
		}
	}

	///Borrows the text of a string, or the name of an atom.
	pub fn as_str(&self, val: Val) -> EResult<&str> {
		match self.heap.data(val) {
			Data::Str(s) => Ok(s),
			Data::Atom(sym) => Ok(self.sym_name(*sym)),
			data => bail!(TypeMismatch, "expected a string, received {}", data.kind().a_type_name())
		}
	}

	pub fn as_sym(&self, val: Val) -> EResult<Sym> {
		match self.heap.data(val) {
			Data::Atom(sym) => Ok(*sym),
			data => bail!(TypeMismatch, "expected an atom, received {}", data.kind().a_type_name())
		}
	}

	pub(crate) fn scalar(&self, val: Val) -> Option<Scalar<'_>> {
		match self.heap.data(val) {
			Data::Integer(i) => Some(Scalar::Int(*i)),
			Data::Short(s) => Some(Scalar::Int(*s as i64)),
			Data::Number(n) => Some(Scalar::Num(*n)),
			Data::Float(f) => Some(Scalar::Num(*f as f64)),
			Data::Str(s) => Some(Scalar::Text(s)),
			Data::Atom(sym) => Some(Scalar::Atom(self.sym_name(*sym))),
			_ => None
		}
	}

	/**
	The natural ordering: numbers of any width compare numerically, and strings or atoms compare
	lexicographically.

	Comparing values of unrelated kinds, or containers, is a type mismatch.
	*/
	pub fn less(&self, a: Val, b: Val) -> EResult<bool> {
		Ok(self.natural_order(a, b)? == Ordering::Less)
	}

	pub(crate) fn natural_order(&self, a: Val, b: Val) -> EResult<Ordering> {
		if let (Some(sa), Some(sb)) = (self.scalar(a), self.scalar(b)) {
			if let Some(ordering) = sa.order(sb) {
				return Ok(ordering)
			}
		}

		bail!(
			TypeMismatch,
			"unable to order {} against {}",
			self.a_type_name(a),
			self.a_type_name(b)
		)
	}
}
