/*!
The value core of a small list-processing runtime.

Values live in an [`Engine`](struct.Engine.html), which hands out `Copy` handles
([`Val`](struct.Val.html)) and tracks ownership with an intrusive share count. Containers are
copied on write, released values are pooled per kind, and cons lists may contain genuine
reference cycles.
*/

pub use elem_engine::*;

pub mod prelude {
	/*!
	The prelude.

	Imports the engine, its handle types, and the error macros.
	*/

	#[doc(no_inline)]
	pub use crate::{
		bail, ensure, error,

		Anchor, AssocIter,
		Bindings,
		EError, EResult, Engine, EngineBuilder, ErrorKind,
		Kind, KeyKind,
		ListCursor,
		Parcel,
		SliceBound, Status, Sym,
		Temps,
		Val,
	};
}
