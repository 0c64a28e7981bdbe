use super::assoc::Key;
use super::engine::Engine;
use super::val::{Data, Kind, Val};
use fnv::FnvHashSet;
use smallvec::SmallVec;
use std::fmt::{self, Display, Formatter, Write};

/*

there are two printers, which share a single walker:
	- the readable printer. sequences print as (a b c), dictionaries as {"k":v "k2":v2}, sets as
	  {a b}. strings are quoted, except for a string printed at the top level.
	- the json printer. sequences and sets print as [a,b,c], dictionaries as {"k":v}, nil as null,
	  and every string and dictionary key is quoted and escaped.

the walk runs off an explicit stack of steps, so deeply nested values don't grow the native
stack. a container which is still open further down that stack prints as #inf (or "#inf" in
json), rather than being expanded forever. a cyclic cons list prints each of its nodes once, followed
by ... (or "#inf").

*/

pub(crate) fn format_number(n: f64) -> String {
	n.to_string()
}

fn quote(out: &mut String, text: &str) {
	out.push('"');
	for c in text.chars() {
		match c {
			'"' => out.push_str("\\\""),
			'\\' => out.push_str("\\\\"),
			'\n' => out.push_str("\\n"),
			'\r' => out.push_str("\\r"),
			'\t' => out.push_str("\\t"),
			c if c.is_control() => {
				let _ = write!(out, "\\u{:04x}", c as u32);
			}
			c => out.push(c)
		}
	}
	out.push('"');
}

//the printer's work stack. a container is opened by pushing its contents, in reverse, above a
//Close step which ends it.
enum Step {
	Print(Val, bool),
	Raw(&'static str),
	Key(Key, Kind),
	Close(Val, &'static str)
}

struct Printer<'a> {
	engine: &'a Engine,
	json: bool,
	parents: FnvHashSet<Val>,
	steps: Vec<Step>,
	out: String
}

impl<'a> Printer<'a> {
	fn new(engine: &'a Engine, json: bool) -> Printer<'a> {
		Printer {
			engine,
			json,
			parents: FnvHashSet::default(),
			steps: Vec::new(),
			out: String::new()
		}
	}

	fn finish(mut self, val: Val) -> String {
		self.steps.push(Step::Print(val, true));

		while let Some(step) = self.steps.pop() {
			match step {
				Step::Print(val, top) => self.print(val, top),
				Step::Raw(text) => self.out.push_str(text),
				Step::Key(key, kind) => self.key(&key, kind),
				Step::Close(val, close) => {
					self.out.push_str(close);
					self.parents.remove(&val);
				}
			}
		}

		self.out
	}

	fn separator(&mut self, i: usize) {
		if i > 0 {
			self.out.push_str(if self.json { "," } else { " " });
		}
	}

	fn separator_step(&self, i: usize, steps: &mut SmallVec<[Step; 32]>) {
		if i > 0 {
			steps.push(Step::Raw(if self.json { "," } else { " " }));
		}
	}

	fn number(&mut self, n: f64) {
		if self.json && !n.is_finite() {
			self.out.push_str("null");
		} else {
			self.out.push_str(&format_number(n));
		}
	}

	fn text(&mut self, text: &str) {
		quote(&mut self.out, text);
	}

	fn print(&mut self, val: Val, top: bool) {
		let engine = self.engine;
		match *engine.heap.data(val) {
			Data::Nil => self.out.push_str(if self.json { "null" } else { "nil" }),
			Data::Bool(b) => self.out.push_str(if b { "true" } else { "false" }),
			Data::Integer(i) => {
				let _ = write!(self.out, "{}", i);
			}
			Data::Short(s) => {
				let _ = write!(self.out, "{}", s);
			}
			Data::Number(n) => self.number(n),
			Data::Float(f) => {
				if self.json && !f.is_finite() {
					self.out.push_str("null");
				} else {
					let _ = write!(self.out, "{}", f);
				}
			}
			Data::Str(ref text) => {
				if top && !self.json {
					self.out.push_str(text);
				} else {
					self.text(text);
				}
			}
			Data::Atom(sym) => {
				if self.json {
					self.text(engine.sym_name(sym));
				} else {
					self.out.push_str(engine.sym_name(sym));
				}
			}
			_ => self.container(val)
		}
	}

	fn container(&mut self, val: Val) {
		if !self.parents.insert(val) {
			self.out.push_str(if self.json { "\"#inf\"" } else { "#inf" });
			return
		}

		let engine = self.engine;
		let kind = engine.kind(val);
		let (open, close) = match kind {
			Kind::DictStr | Kind::DictNum | Kind::DictInt => ("{", "}"),
			_ if self.json => ("[", "]"),
			Kind::Set => ("{", "}"),
			_ => ("(", ")")
		};

		self.out.push_str(open);

		//typed vectors are written straight away. anything which can hold a container is
		//queued up as steps instead.
		let mut steps = SmallVec::<[Step; 32]>::new();
		match engine.heap.data(val) {
			Data::Integers(items) => {
				for (i, n) in items.iter().enumerate() {
					self.separator(i);
					let _ = write!(self.out, "{}", n);
				}
			}
			Data::Shorts(items) => {
				for (i, n) in items.iter().enumerate() {
					self.separator(i);
					let _ = write!(self.out, "{}", n);
				}
			}
			Data::Numbers(items) => {
				for (i, &n) in items.iter().enumerate() {
					self.separator(i);
					self.number(n);
				}
			}
			Data::Floats(items) => {
				for (i, &f) in items.iter().enumerate() {
					self.separator(i);
					self.number(f as f64);
				}
			}
			Data::Strings(items) => {
				for (i, text) in items.iter().enumerate() {
					self.separator(i);
					self.text(text);
				}
			}
			Data::Values(items) => {
				for (i, &item) in items.iter().enumerate() {
					self.separator_step(i, &mut steps);
					steps.push(Step::Print(item, false));
				}
			}
			Data::List(first) => {
				let chain = engine.nodes.chain(*first);
				for (i, &node) in chain.nodes.iter().enumerate() {
					self.separator_step(i, &mut steps);
					steps.push(Step::Print(engine.nodes.value(node), false));
				}

				if chain.cycle.is_some() {
					self.separator_step(chain.len(), &mut steps);
					steps.push(Step::Raw(if self.json { "\"#inf\"" } else { "..." }));
				}
			}
			_ => {
				let entries = engine.sorted_entries(val).unwrap_or_default();
				for (i, (key, item)) in entries.into_iter().enumerate() {
					self.separator_step(i, &mut steps);
					if kind != Kind::Set {
						steps.push(Step::Key(key, kind));
						steps.push(Step::Raw(":"));
					}
					steps.push(Step::Print(item, false));
				}
			}
		}

		self.steps.push(Step::Close(val, close));
		self.steps.extend(steps.into_iter().rev());
	}

	fn key(&mut self, key: &Key, kind: Kind) {
		let text = key.display_in(self.engine);
		if self.json || kind == Kind::DictStr {
			self.text(&text);
		} else {
			self.out.push_str(&text);
		}
	}
}

impl Engine {
	///The readable form of a value. A string at the top level is returned without quotes.
	pub fn as_string(&self, val: Val) -> String {
		Printer::new(self, false).finish(val)
	}

	///The JSON form of a value. Self-reference is printed as the string `"#inf"`.
	pub fn as_json(&self, val: Val) -> String {
		Printer::new(self, true).finish(val)
	}

	///Returns an adapter which formats `val` using [`as_string`](#method.as_string).
	pub fn display(&self, val: Val) -> Displayed<'_> {
		Displayed {
			engine: self,
			val
		}
	}
}

pub struct Displayed<'a> {
	engine: &'a Engine,
	val: Val
}

impl<'a> Display for Displayed<'a> {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		f.write_str(&self.engine.as_string(self.val))
	}
}
