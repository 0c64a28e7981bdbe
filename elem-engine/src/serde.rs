#![cfg(feature = "serde")]

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use super::assoc::Key;
use super::engine::Engine;
use super::error::EResult;
use super::val::{Data, Kind, Val};
use fnv::FnvHashSet;

/*

this module is only present when the "serde" crate feature is enabled. values are serialized
through a borrowed view, Serializable, which pairs a Val with its engine.

sequences become serde sequences, and dictionaries become maps. nil is a unit. a set is
serialized as a sequence of its elements, in order.

a value which contains a reference cycle, or which nests containers more than MAX_DEPTH deep,
can't be serialized. making a Serializable checks for both up front, so serialization itself never
fails partway through.

*/

//serializers recurse once per level of nesting
const MAX_DEPTH: usize = 256;

///A borrowed view of a value which implements `Serialize`. Made by
///[`Engine::serializable`](struct.Engine.html#method.serializable).
#[derive(Copy, Clone)]
pub struct Serializable<'a> {
	engine: &'a Engine,
	val: Val
}

impl Engine {
	///Returns a `Serialize` view of `val`. A value containing a reference cycle, or containers
	///nested more than 256 deep, is a consistency error.
	pub fn serializable(&self, val: Val) -> EResult<Serializable<'_>> {
		self.check_acyclic(val)?;

		Ok(Serializable {
			engine: self,
			val
		})
	}

	//a depth-first walk over an explicit stack. `open` holds the containers on the current path,
	//and `finished` those whose contents have been fully checked, so shared parts are only
	//visited once.
	fn check_acyclic(&self, root: Val) -> EResult<()> {
		let mut open = FnvHashSet::default();
		let mut finished = FnvHashSet::default();
		let mut stack = vec![(root, 1, false)];
		let mut children = Vec::new();

		while let Some((val, depth, leaving)) = stack.pop() {
			if leaving {
				open.remove(&val);
				finished.insert(val);
				continue
			}

			if !self.kind(val).is_container() || finished.contains(&val) {
				continue
			}

			ensure!(
				!open.contains(&val),
				Consistency,
				"unable to serialize {}, which contains itself",
				self.a_type_name(val)
			);

			ensure!(
				depth <= MAX_DEPTH,
				Consistency,
				"unable to serialize containers nested more than {} deep",
				MAX_DEPTH
			);

			if self.kind(val) == Kind::List {
				ensure!(!self.list_is_cyclic(val)?, Consistency, "unable to serialize a cyclic list");
			}

			open.insert(val);
			stack.push((val, depth, true));

			self.children_of(val, &mut children);
			stack.extend(children.drain(..).map(|child| (child, depth + 1, false)));
		}

		Ok(())
	}
}

impl<'a> Serializable<'a> {
	fn child(&self, val: Val) -> Serializable<'a> {
		Serializable {
			engine: self.engine,
			val
		}
	}
}

struct KeyView<'a> {
	engine: &'a Engine,
	key: &'a Key
}

impl<'a> Serialize for KeyView<'a> {
	fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
		match *self.key {
			Key::Nil => s.serialize_unit(),
			Key::Bool(b) => s.serialize_bool(b),
			Key::Int(i) => s.serialize_i64(i),
			Key::Num(bits) => s.serialize_f64(f64::from_bits(bits)),
			Key::Str(ref text) => s.serialize_str(text),
			Key::Atom(sym) => s.serialize_str(self.engine.sym_name(sym))
		}
	}
}

impl<'a> Serialize for Serializable<'a> {
	fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
		let engine = self.engine;
		match *engine.heap.data(self.val) {
			Data::Nil => s.serialize_unit(),
			Data::Bool(b) => s.serialize_bool(b),
			Data::Number(n) => s.serialize_f64(n),
			Data::Integer(i) => s.serialize_i64(i),
			Data::Float(f) => s.serialize_f32(f),
			Data::Short(n) => s.serialize_i16(n),
			Data::Str(ref text) => s.serialize_str(text),
			Data::Atom(sym) => s.serialize_str(engine.sym_name(sym)),
			Data::Integers(ref items) => items.serialize(s),
			Data::Floats(ref items) => items.serialize(s),
			Data::Numbers(ref items) => items.serialize(s),
			Data::Shorts(ref items) => items.serialize(s),
			Data::Strings(ref items) => items.serialize(s),
			Data::Values(ref items) => {
				let mut seq = s.serialize_seq(Some(items.len()))?;
				for &item in items {
					seq.serialize_element(&self.child(item))?;
				}
				seq.end()
			}
			Data::List(first) => {
				let chain = engine.nodes.chain(first);
				let mut seq = s.serialize_seq(Some(chain.len()))?;
				for &node in &chain.nodes {
					seq.serialize_element(&self.child(engine.nodes.value(node)))?;
				}
				seq.end()
			}
			Data::Set(_) => {
				let entries = engine.sorted_entries(self.val).unwrap_or_default();
				let mut seq = s.serialize_seq(Some(entries.len()))?;
				for (_, item) in entries {
					seq.serialize_element(&self.child(item))?;
				}
				seq.end()
			}
			Data::DictStr(_) | Data::DictNum(_) | Data::DictInt(_) => {
				let entries = engine.sorted_entries(self.val).unwrap_or_default();
				let mut map = s.serialize_map(Some(entries.len()))?;
				for (key, item) in &entries {
					map.serialize_entry(&KeyView { engine, key }, &self.child(*item))?;
				}
				map.end()
			}
		}
	}
}
