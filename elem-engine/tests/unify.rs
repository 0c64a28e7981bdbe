use elem_engine::{Bindings, Engine, KeyKind};

#[test]
fn equality_across_widths_and_kinds() {
	let mut engine = Engine::new();

	let (short, number) = (engine.provide_short(3), engine.provide_number(3.0));
	assert!(engine.equal(short, number));
	assert!(engine.egal(short, number));

	let text = engine.provide_string("3");
	assert!(!engine.equal(number, text));

	let ints = engine.provide_integers(&[1, 2]);
	let list = {
		let (one, two) = (engine.provide_integer(1), engine.provide_integer(2));
		engine.provide_list(&[one, two])
	};
	assert!(!engine.equal(ints, list));

	let a = engine.provide_dict(KeyKind::Str);
	let b = engine.provide_dict(KeyKind::Int);
	assert!(!engine.equal(a, b));
	assert!(engine.equal(a, a));
}

#[test]
fn dictionaries_compare_by_keys_and_values() {
	let mut engine = Engine::new();

	let pairs = engine.provide_strings(&["a", "1", "b", "2"]);
	let swapped = engine.provide_strings(&["b", "2", "a", "1"]);
	let a = engine.dict_from_pairs(KeyKind::Str, pairs).unwrap();
	let b = engine.dict_from_pairs(KeyKind::Str, swapped).unwrap();
	assert!(engine.equal(a, b));

	let (key, other) = (engine.provide_string("b"), engine.provide_string("3"));
	let b = engine.record(b, key, other).unwrap();
	assert!(!engine.equal(a, b));
}

#[test]
fn variables_bind_and_must_agree() {
	let mut engine = Engine::new();

	let (x, y, wild) = (engine.atom("x"), engine.atom("y"), engine.atom("_"));
	let pattern = engine.provide_values(&[x, wild, y, x]);

	let items: Vec<_> = [1, 2, 3, 1].iter().map(|&i| engine.provide_integer(i)).collect();
	let value = engine.provide_values(&items);

	let mut bindings = Bindings::new();
	assert!(engine.unify(pattern, value, Some(&mut bindings)).unwrap());
	assert_eq!(bindings.len(), 2);

	let (sx, sy) = (engine.sym("x"), engine.sym("y"));
	assert_eq!(bindings.get(sx), Some(items[0]));
	assert_eq!(bindings.get(sy), Some(items[2]));

	//x is already bound to 1
	let mismatched = engine.provide_integers(&[2, 0, 0, 2]);
	assert!(!engine.unify(pattern, mismatched, Some(&mut bindings)).unwrap());
	assert_eq!(bindings.len(), 2);

	bindings.release(&mut engine);
}

#[test]
fn rest_patterns_capture_the_tail() {
	let mut engine = Engine::new();

	let (head, dollar, rest) = (engine.atom("head"), engine.atom("$"), engine.atom("rest"));
	let pattern = engine.provide_list(&[head, dollar, rest]);

	let items: Vec<_> = (1 ..= 4).map(|i| engine.provide_integer(i)).collect();
	let value = engine.provide_list(&items);

	let mut bindings = Bindings::new();
	assert!(engine.unify(pattern, value, Some(&mut bindings)).unwrap());

	let rest = bindings.get(engine.sym("rest")).unwrap();
	assert!(engine.is_list(rest));
	assert_eq!(engine.as_string(rest), "(2 3 4)");

	//against a vector, the rest is a generic vector
	let mut bindings_vec = Bindings::new();
	let vector = engine.provide_integers(&[7]);
	assert!(engine.unify(pattern, vector, Some(&mut bindings_vec)).unwrap());
	let rest = bindings_vec.get(engine.sym("rest")).unwrap();
	assert_eq!(engine.kind(rest), elem_engine::Kind::Values);
	assert_eq!(engine.size(rest).unwrap(), 0);

	bindings.release(&mut engine);
	bindings_vec.release(&mut engine);
}

#[test]
fn length_mismatches_fail() {
	let mut engine = Engine::new();

	let x = engine.atom("x");
	let pattern = engine.provide_values(&[x, x]);
	let short = engine.provide_integers(&[1]);
	let long = engine.provide_integers(&[1, 1, 1]);
	let text = engine.provide_string("xx");

	assert!(!engine.unify(pattern, short, None).unwrap());
	assert!(!engine.unify(pattern, long, None).unwrap());
	assert!(!engine.unify(pattern, text, None).unwrap());
}

#[test]
fn dictionary_patterns_match_subsets() {
	let mut engine = Engine::new();

	let (name, age, who) = (engine.provide_string("name"), engine.provide_string("age"), engine.atom("who"));
	let pattern = engine.provide_dict(KeyKind::Str);
	let pattern = engine.record(pattern, name, who).unwrap();

	let (ann, forty) = (engine.provide_string("ann"), engine.provide_integer(40));
	let value = engine.provide_dict(KeyKind::Str);
	let value = engine.record(value, name, ann).unwrap();
	let value = engine.record(value, age, forty).unwrap();

	let mut bindings = Bindings::new();
	assert!(engine.unify(pattern, value, Some(&mut bindings)).unwrap());
	assert_eq!(bindings.get(engine.sym("who")), Some(ann));
	bindings.release(&mut engine);

	//every key in the pattern must be present
	assert!(!engine.unify(value, pattern, None).unwrap());
}

#[test]
fn self_referential_patterns_terminate() {
	let mut engine = Engine::new();

	let x = engine.atom("x");
	let pattern = engine.provide_values(&[x]);
	engine.increment(pattern);
	let pattern = engine.append(pattern, pattern).unwrap();

	let one = engine.provide_integer(1);
	let value = engine.provide_values(&[one]);
	engine.increment(value);
	let value = engine.append(value, value).unwrap();

	assert!(engine.unify(pattern, value, None).unwrap());
	assert!(engine.equal(pattern, pattern));
}
