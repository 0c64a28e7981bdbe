use elem_engine::{Bindings, Engine, Kind, KeyKind, Val};

const DEPTH: usize = 100_000;

//a generic vector nested `depth` levels deep, with `leaf` at the bottom
fn nested(engine: &mut Engine, depth: usize, leaf: Val) -> Val {
	let mut inner = engine.provide_values(&[leaf]);
	for _ in 1 .. depth {
		inner = engine.provide_values(&[inner]);
	}
	inner
}

//vectors, cons lists and dictionaries, taking turns
fn mixed(engine: &mut Engine, depth: usize) -> Val {
	let mut inner = engine.provide_integer(7);
	for i in 0 .. depth {
		inner = match i % 3 {
			0 => engine.provide_values(&[inner]),
			1 => engine.provide_list(&[inner]),
			_ => {
				let key = engine.provide_string("k");
				let dict = engine.provide_dict(KeyKind::Str);
				engine.record(dict, key, inner).unwrap()
			}
		};
	}
	inner
}

#[test]
fn fullcopy_of_deep_nesting() {
	let mut engine = Engine::new();
	let one = engine.provide_integer(1);
	let deep = nested(&mut engine, DEPTH, one);
	engine.increment(deep);

	let copy = engine.fullcopy(deep);
	assert_ne!(copy, deep);
	assert_eq!(engine.stats().kind(Kind::Values).live, DEPTH * 2);

	let forced = engine.copying(deep, true);
	assert_ne!(forced, deep);
	assert_eq!(engine.index(forced, 0).unwrap(), engine.index(deep, 0).unwrap());

	engine.release(copy);
	engine.release(forced);
	engine.decrement(deep);
	assert_eq!(engine.stats().kind(Kind::Values).live, 0);
}

#[test]
fn copyatom_of_deep_nesting() {
	let mut engine = Engine::new();
	let deep = mixed(&mut engine, DEPTH);
	engine.increment(deep);
	engine.increment(deep);

	//every container is owned, so every container is copied
	let copy = engine.copyatom(deep, 1);
	assert_ne!(copy, deep);
	assert!(engine.equal(copy, deep));
	assert_eq!(engine.stats().kind(Kind::Values).live, 2 * (DEPTH + 2) / 3);
}

#[test]
fn equality_of_deep_nesting() {
	let mut engine = Engine::new();
	let (one, two) = (engine.provide_integer(1), engine.provide_integer(2));
	let a = nested(&mut engine, DEPTH, one);
	let b = nested(&mut engine, DEPTH, one);
	let c = nested(&mut engine, DEPTH, two);

	assert!(engine.equal(a, b));
	assert!(!engine.equal(a, c));

	let d = mixed(&mut engine, DEPTH);
	let e = engine.fullcopy(d);
	assert!(engine.equal(d, e));
}

#[test]
fn unification_of_deep_nesting() {
	let mut engine = Engine::new();
	let (x, one) = (engine.atom("x"), engine.provide_integer(1));
	let pattern = nested(&mut engine, DEPTH, x);
	let value = nested(&mut engine, DEPTH, one);

	let mut bindings = Bindings::new();
	assert!(engine.unify(pattern, value, Some(&mut bindings)).unwrap());
	assert_eq!(bindings.get(engine.sym("x")), Some(one));
	bindings.release(&mut engine);

	let shallow = nested(&mut engine, DEPTH - 1, one);
	assert!(!engine.unify(pattern, shallow, None).unwrap());
}

#[test]
fn printing_deep_nesting() {
	let mut engine = Engine::new();
	let one = engine.provide_integer(1);
	let deep = nested(&mut engine, DEPTH, one);

	let text = engine.as_string(deep);
	assert_eq!(text.len(), DEPTH * 2 + 1);
	assert!(text.starts_with("((((") && text.ends_with("1))))"));

	let json = engine.as_json(deep);
	assert_eq!(json.len(), DEPTH * 2 + 1);
	assert!(json.starts_with("[[[[") && json.ends_with("1]]]]"));

	let deep = mixed(&mut engine, 3);
	assert_eq!(engine.as_string(deep), "{\"k\":((7))}");
	let deep = mixed(&mut engine, DEPTH);
	assert!(engine.as_string(deep).contains("{\"k\":((7))}"));
}

#[test]
fn transfer_of_deep_nesting() {
	let mut src = Engine::new();
	let mut dst = Engine::new();

	let deep = mixed(&mut src, DEPTH);
	let moved = src.transfer(deep, &mut dst);
	assert_eq!(dst.kind(moved), src.kind(deep));
	assert_eq!(dst.stats().live_nodes, src.stats().live_nodes);
}
