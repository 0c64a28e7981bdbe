#![forbid(unsafe_code)]

#[macro_use]
mod error;

mod engine;
mod gc;
mod val;
mod seq;
mod list;
mod assoc;

#[macro_use]
mod collections;

mod copy;
mod unify;
mod print;
mod serde;

pub use self::{
	assoc::{AssocIter, KeyKind},
	engine::{Engine, EngineBuilder, EngineStats, KindStats, Parcel, Sym},
	error::{EError, EResult, ErrorKind},
	gc::{Status, Temps},
	list::{ListCursor, NodeId},
	print::Displayed,
	seq::{find_all, quicksort, rotate, set_op, unique, Anchor, SetOp, SliceBound},
	unify::Bindings,
	val::{Kind, Val}
};

#[cfg(feature = "serde")]
pub use self::serde::Serializable;
