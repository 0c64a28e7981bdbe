use elem_engine::{Engine, KeyKind, Val};

fn strings(engine: &mut Engine, seq: Val) -> Vec<String> {
	let len = engine.size(seq).unwrap();
	(0 .. len).map(|i| {
		let item = engine.index(seq, i as i64).unwrap();
		engine.as_string(item)
	}).collect()
}

#[test]
fn record_lookup_and_remove() {
	let mut engine = Engine::new();

	let dict = engine.provide_dict(KeyKind::Str);
	engine.increment(dict);

	let (name, value) = (engine.provide_string("name"), engine.provide_string("elem"));
	assert_eq!(engine.record(dict, name, value).unwrap(), dict);
	assert_eq!(engine.lookup(dict, name).unwrap(), Some(value));
	assert_eq!(engine.size(dict).unwrap(), 1);

	//replacing a value releases the old one
	let other = engine.provide_string("other");
	engine.record(dict, name, other).unwrap();
	assert!(!engine.is_live(value));
	assert_eq!(engine.lookup(dict, name).unwrap(), Some(other));

	engine.remove_key(dict, name).unwrap();
	assert_eq!(engine.lookup(dict, name).unwrap(), None);
	assert!(!engine.is_live(other));

	//removing a missing key is a no-op
	assert_eq!(engine.remove_key(dict, name).unwrap(), dict);
}

#[test]
fn string_keys_stringify_numbers_and_atoms() {
	let mut engine = Engine::new();

	let dict = engine.provide_dict(KeyKind::Str);
	let (seven, flag) = (engine.provide_integer(7), engine.atom("flag"));
	let (a, b) = (engine.provide_string("a"), engine.provide_string("b"));
	let dict = engine.record(dict, seven, a).unwrap();
	let dict = engine.record(dict, flag, b).unwrap();

	let key = engine.provide_string("7");
	assert_eq!(engine.lookup(dict, key).unwrap(), Some(a));
	let key = engine.provide_string("flag");
	assert_eq!(engine.lookup(dict, key).unwrap(), Some(b));

	let vec = engine.provide_integers(&[1]);
	assert!(engine.record(dict, vec, a).unwrap_err().is_type_mismatch());
}

#[test]
fn numeric_keys() {
	let mut engine = Engine::new();

	let by_number = engine.provide_dict(KeyKind::Num);
	let (two, two_float, half) = (engine.provide_integer(2), engine.provide_number(2.0), engine.provide_number(0.5));
	let value = engine.provide_string("two");
	let by_number = engine.record(by_number, two, value).unwrap();
	assert_eq!(engine.lookup(by_number, two_float).unwrap(), Some(value));
	assert_eq!(engine.lookup(by_number, half).unwrap(), None);

	let text = engine.provide_string("2");
	assert!(engine.record(by_number, text, value).unwrap_err().is_type_mismatch());

	let by_int = engine.provide_dict(KeyKind::Int);
	let fraction = engine.provide_number(2.9);
	let by_int = engine.record(by_int, fraction, value).unwrap();
	assert_eq!(engine.lookup(by_int, two).unwrap(), Some(value));
}

#[test]
fn keys_and_values_follow_key_order() {
	let mut engine = Engine::new();

	let dict = engine.provide_dict(KeyKind::Int);
	for &(key, value) in &[(30, "c"), (-5, "a"), (12, "b")] {
		let (key, value) = (engine.provide_integer(key), engine.provide_string(value));
		engine.record(dict, key, value).unwrap();
	}

	let keys = engine.thekeys(dict).unwrap();
	assert_eq!(engine.as_string(keys), "(-5 12 30)");

	let values = engine.thevalues(dict).unwrap();
	assert_eq!(strings(&mut engine, values), vec!["a", "b", "c"]);

	assert_eq!(engine.as_string(dict), "{-5:\"a\" 12:\"b\" 30:\"c\"}");
}

#[test]
fn dictionaries_from_pairs() {
	let mut engine = Engine::new();

	let pairs = engine.provide_strings(&["x", "1", "y", "2", "x", "3"]);
	let dict = engine.dict_from_pairs(KeyKind::Str, pairs).unwrap();
	assert_eq!(engine.size(dict).unwrap(), 2);
	assert_eq!(engine.as_json(dict), "{\"x\":\"3\",\"y\":\"2\"}");

	let live = engine.stats().live;
	let odd = engine.provide_strings(&["x", "1", "y"]);
	let err = engine.dict_from_pairs(KeyKind::Str, odd).unwrap_err();
	assert!(err.is_consistency());

	engine.release(odd);
	assert_eq!(engine.stats().live, live);
}

#[test]
fn sets_hold_leaves_once() {
	let mut engine = Engine::new();

	let (one, one_float, two) = (engine.provide_integer(1), engine.provide_number(1.0), engine.provide_integer(2));
	let set = engine.set_from_values(&[two, one, one_float]).unwrap();
	assert_eq!(engine.size(set).unwrap(), 2);
	assert!(engine.set_contains(set, one_float).unwrap());
	assert!(engine.contains(set, two).unwrap());

	let another_two = engine.provide_number(2.0);
	let set = engine.set_remove(set, another_two).unwrap();
	assert!(!engine.set_contains(set, another_two).unwrap());
	assert!(!engine.is_live(two));

	//the stored element keeps its own kind
	let elements = engine.thekeys(set).unwrap();
	let first = engine.index(elements, 0).unwrap();
	assert_eq!(first, one);

	let list = engine.provide_list(&[]);
	assert!(engine.set_insert(set, list).unwrap_err().is_type_mismatch());

	let dict = engine.provide_dict(KeyKind::Str);
	assert!(engine.set_contains(dict, one).unwrap_err().is_type_mismatch());
}

#[test]
fn shared_dictionaries_are_copied_before_editing() {
	let mut engine = Engine::new();

	let dict = engine.provide_dict(KeyKind::Str);
	let (key, value) = (engine.provide_string("k"), engine.provide_integer(1));
	let dict = engine.record(dict, key, value).unwrap();
	engine.increment(dict);
	engine.increment(dict);

	let other = engine.provide_integer(2);
	let edited = engine.record(dict, key, other).unwrap();
	assert_ne!(edited, dict);
	assert_eq!(engine.lookup(dict, key).unwrap(), Some(value));
	assert_eq!(engine.lookup(edited, key).unwrap(), Some(other));
}

#[test]
fn iteration_sees_a_stable_snapshot() {
	let mut engine = Engine::new();

	let dict = engine.provide_dict(KeyKind::Str);
	engine.increment(dict);
	for &name in &["b", "a", "c"] {
		let (key, value) = (engine.provide_string(name), engine.provide_string(name));
		engine.record(dict, key, value).unwrap();
	}

	let mut iter = engine.begin_iter(dict).unwrap();
	let mut seen = Vec::new();
	let mut edited = dict;
	while let Some((key, value)) = engine.next_iter(&mut iter) {
		seen.push(engine.as_string(key));
		assert_eq!(engine.as_string(value), engine.as_string(key));

		let extra = engine.provide_string("zz");
		edited = engine.record(edited, extra, value).unwrap();
	}
	engine.clean_iter(iter);

	assert_eq!(seen, vec!["a", "b", "c"]);
	assert_ne!(edited, dict);
	assert_eq!(engine.size(dict).unwrap(), 3);
	assert_eq!(engine.size(edited).unwrap(), 4);
	assert_eq!(engine.status(dict).count(), Some(1));
}

#[test]
fn iterating_a_temporary_leaves_it_usable() {
	let mut engine = Engine::new();

	let dict = engine.provide_dict(KeyKind::Str);
	let (key, value) = (engine.provide_string("a"), engine.provide_integer(1));
	let dict = engine.record(dict, key, value).unwrap();
	assert_eq!(engine.status(dict).count(), Some(0));

	let mut iter = engine.begin_iter(dict).unwrap();
	assert!(engine.is_shared(dict));

	let mut seen = 0;
	let mut edited = dict;
	while let Some((_, value)) = engine.next_iter(&mut iter) {
		seen += 1;
		let extra = engine.provide_string("b");
		edited = engine.record(edited, extra, value).unwrap();
	}
	engine.clean_iter(iter);

	assert_eq!(seen, 1);
	assert_ne!(edited, dict);
	assert!(engine.is_live(dict));
	assert_eq!(engine.status(dict).count(), Some(0));
	assert_eq!(engine.size(dict).unwrap(), 1);
	assert_eq!(engine.size(edited).unwrap(), 2);

	//still a temporary, so releasing it reclaims it
	engine.release(dict);
	assert!(!engine.is_live(dict));
}
