use elem_engine::{Anchor, Engine, Kind, SliceBound, Val};

fn ints(engine: &mut Engine, seq: Val) -> Vec<i64> {
	let len = engine.size(seq).unwrap();
	(0 .. len).map(|i| {
		let item = engine.index(seq, i as i64).unwrap();
		engine.as_integer(item).unwrap()
	}).collect()
}

fn strings(engine: &mut Engine, seq: Val) -> Vec<String> {
	let len = engine.size(seq).unwrap();
	(0 .. len).map(|i| {
		let item = engine.index(seq, i as i64).unwrap();
		engine.as_str(item).unwrap().to_string()
	}).collect()
}

//-------------------------------------------------------------------------------------------------
// sorting
//-------------------------------------------------------------------------------------------------

#[test]
fn sort_with_a_comparator() {
	let mut engine = Engine::new();

	let data: Vec<i64> = (0 .. 100).map(|i| (i * 37) % 101 - 50).collect();
	let vec = engine.provide_integers(&data);
	let sorted = engine.sort(vec, |engine, a, b| engine.less(a, b)).unwrap();
	assert_eq!(sorted, vec);

	let mut expected = data.clone();
	expected.sort();
	assert_eq!(ints(&mut engine, vec), expected);

	let descending = engine.sort(vec, |engine, a, b| engine.less(b, a)).unwrap();
	expected.reverse();
	assert_eq!(ints(&mut engine, descending), expected);
}

#[test]
fn non_strict_comparators_are_contract_errors() {
	let mut engine = Engine::new();

	let vec = engine.provide_integers(&[3, 1, 2]);
	let err = engine.sort(vec, |engine, a, b| Ok(!engine.less(b, a)?)).unwrap_err();
	assert!(err.is_contract());
	assert_eq!(ints(&mut engine, vec), vec![3, 1, 2]);
}

#[test]
fn comparator_errors_leave_the_sequence_untouched() {
	let mut engine = Engine::new();

	let two = engine.provide_integer(2);
	let text = engine.provide_string("one");
	let three = engine.provide_integer(3);
	let vec = engine.provide_values(&[two, text, three]);

	let err = engine.sort(vec, |engine, a, b| engine.less(a, b)).unwrap_err();
	assert!(err.is_type_mismatch());
	assert_eq!(engine.index(vec, 1).unwrap(), text);
}

#[test]
fn natural_sorting_of_typed_vectors_and_lists() {
	let mut engine = Engine::new();

	let words = engine.provide_strings(&["pear", "apple", "fig"]);
	engine.sort_natural(words, false).unwrap();
	assert_eq!(strings(&mut engine, words), vec!["apple", "fig", "pear"]);

	let items: Vec<Val> = [5, -1, 3].iter().map(|&i| engine.provide_integer(i)).collect();
	let list = engine.provide_list(&items);
	engine.sort_natural(list, true).unwrap();
	assert_eq!(ints(&mut engine, list), vec![5, 3, -1]);
}

#[test]
fn sorting_a_shared_sequence_sorts_a_copy() {
	let mut engine = Engine::new();

	let vec = engine.provide_integers(&[2, 1]);
	engine.increment(vec);
	engine.increment(vec);

	let sorted = engine.sort_natural(vec, false).unwrap();
	assert_ne!(sorted, vec);
	assert_eq!(ints(&mut engine, vec), vec![2, 1]);
	assert_eq!(ints(&mut engine, sorted), vec![1, 2]);
}

//-------------------------------------------------------------------------------------------------
// copy-on-write
//-------------------------------------------------------------------------------------------------

#[test]
fn writes_to_shared_vectors_never_leak() {
	let mut engine = Engine::new();

	let inner = engine.provide_integers(&[1, 2]);
	let a = engine.provide_values(&[inner]);
	let b = engine.provide_values(&[inner]);
	engine.increment(a);
	engine.increment(b);

	let shared_inner = engine.index(a, 0).unwrap();
	let nine = engine.provide_integer(9);
	let edited = engine.replace(shared_inner, 0, nine).unwrap();
	assert_ne!(edited, inner);

	assert_eq!(ints(&mut engine, inner), vec![1, 2]);
	assert_eq!(ints(&mut engine, edited), vec![9, 2]);

	let first_of_b = engine.index(b, 0).unwrap();
	assert_eq!(ints(&mut engine, first_of_b), vec![1, 2]);
}

#[test]
fn unshared_vectors_are_edited_in_place() {
	let mut engine = Engine::new();

	let vec = engine.provide_floats(&[1.0, 2.0]);
	engine.increment(vec);

	let three = engine.provide_number(3.5);
	assert_eq!(engine.append(vec, three).unwrap(), vec);
	assert_eq!(engine.insert(vec, 0, three).unwrap(), vec);
	assert_eq!(engine.remove_at(vec, -1).unwrap(), vec);
	assert_eq!(engine.as_string(vec), "(3.5 1 2)");
}

//-------------------------------------------------------------------------------------------------
// access
//-------------------------------------------------------------------------------------------------

#[test]
fn indices_are_checked() {
	let mut engine = Engine::new();

	let vec = engine.provide_shorts(&[1, 2, 3]);
	let last = engine.index(vec, -1).unwrap();
	assert_eq!(engine.as_integer(last).unwrap(), 3);
	assert!(engine.index(vec, 3).unwrap_err().is_index());
	assert!(engine.index(vec, -4).unwrap_err().is_index());

	let big = engine.provide_integer(100_000);
	assert!(engine.append(vec, big).unwrap_err().is_type_mismatch());
}

#[test]
fn car_cdr_and_pop() {
	let mut engine = Engine::new();

	let vec = engine.provide_integers(&[1, 2, 3]);
	engine.increment(vec);

	let car = engine.car(vec).unwrap();
	assert_eq!(engine.as_integer(car).unwrap(), 1);
	let cdr = engine.cdr(vec).unwrap();
	assert_eq!(ints(&mut engine, cdr), vec![2, 3]);

	let (popped_from, item) = engine.pop(vec).unwrap();
	assert_eq!(popped_from, vec);
	assert_eq!(engine.as_integer(item).unwrap(), 3);
	assert_eq!(ints(&mut engine, vec), vec![1, 2]);

	let empty = engine.provide_values(&[]);
	assert!(engine.car(empty).map(|val| engine.is_nil(val)).unwrap());
	assert!(engine.pop(empty).unwrap_err().is_index());
}

#[test]
fn search() {
	let mut engine = Engine::new();

	let vec = engine.provide_integers(&[4, 1, 4, 2]);
	let four = engine.provide_number(4.0);
	assert_eq!(engine.find(vec, four).unwrap(), Some(0));
	assert_eq!(engine.rfind(vec, four).unwrap(), Some(2));
	assert_eq!(engine.count_of(vec, four).unwrap(), 2);
	assert_eq!(engine.find_all(vec, four).unwrap(), vec![0, 2]);

	let seven = engine.provide_integer(7);
	assert!(!engine.contains(vec, seven).unwrap());

	let text = engine.provide_string("banana");
	let needle = engine.provide_string("an");
	assert_eq!(engine.find_all(text, needle).unwrap(), vec![1, 3]);

	let replaced = engine.replace_all(vec, four, seven).unwrap();
	assert_eq!(ints(&mut engine, replaced), vec![7, 1, 7, 2]);
}

//-------------------------------------------------------------------------------------------------
// slicing
//-------------------------------------------------------------------------------------------------

#[test]
fn index_bounds_are_clamped() {
	let mut engine = Engine::new();

	let vec = engine.provide_integers(&[0, 1, 2, 3, 4]);
	let cases: &[(i64, Option<i64>, &[i64])] = &[
		(1, Some(3), &[1, 2]),
		(-2, None, &[3, 4]),
		(3, Some(1), &[]),
		(-100, Some(100), &[0, 1, 2, 3, 4]),
		(5, None, &[])
	];

	for &(from, to, expected) in cases {
		let to = to.map(SliceBound::Index);
		let slice = engine.extract(vec, &SliceBound::Index(from), to.as_ref()).unwrap();
		assert_eq!(ints(&mut engine, slice), expected);
	}
}

#[test]
fn adjacent_slices_concatenate_to_the_whole() {
	let mut engine = Engine::new();

	let text = engine.provide_string("hello, world");
	for split in 0 .. 13 {
		let left = engine.extract(text, &SliceBound::Index(0), Some(&SliceBound::Index(split))).unwrap();
		let right = engine.extract(text, &SliceBound::Index(split), None).unwrap();
		let joined = format!("{}{}", engine.as_str(left).unwrap(), engine.as_str(right).unwrap());
		assert_eq!(joined, "hello, world");
	}
}

#[test]
fn anchors_search_strings() {
	let mut engine = Engine::new();

	let text = engine.provide_string("key=value;rest");
	let value = engine.extract_between(text, "=", Some(";")).unwrap();
	assert_eq!(engine.as_str(value).unwrap(), "value");

	let inclusive = engine.extract_between(text, "+=", Some("+;")).unwrap();
	assert_eq!(engine.as_str(inclusive).unwrap(), "=value;");

	let missing = engine.extract_between(text, "#", None).unwrap();
	assert_eq!(engine.as_str(missing).unwrap(), "");

	let path = engine.provide_string("a/b/c");
	let last = engine.extract(path, &SliceBound::Anchor(Anchor::parse("-/")), None).unwrap();
	assert_eq!(engine.as_str(last).unwrap(), "c");
}

#[test]
fn anchors_search_string_elements() {
	let mut engine = Engine::new();

	let words = engine.provide_strings(&["a", "start", "b", "c", "end", "d"]);
	let middle = engine.extract_between(words, "start", Some("end")).unwrap();
	assert_eq!(strings(&mut engine, middle), vec!["b", "c"]);

	let numbers = engine.provide_integers(&[1, 2]);
	assert!(engine.extract_between(numbers, "1", None).unwrap_err().is_index());
}

//-------------------------------------------------------------------------------------------------
// rotation, reversal, uniqueness, set algebra
//-------------------------------------------------------------------------------------------------

#[test]
fn rotate_and_reverse() {
	let mut engine = Engine::new();

	let vec = engine.provide_integers(&[1, 2, 3]);
	engine.rotate(vec, true).unwrap();
	assert_eq!(ints(&mut engine, vec), vec![3, 1, 2]);
	engine.rotate(vec, false).unwrap();
	assert_eq!(ints(&mut engine, vec), vec![1, 2, 3]);

	let reversed = engine.reverse(vec, true).unwrap();
	assert_ne!(reversed, vec);
	assert_eq!(ints(&mut engine, reversed), vec![3, 2, 1]);
	assert_eq!(ints(&mut engine, vec), vec![1, 2, 3]);

	assert_eq!(engine.reverse(vec, false).unwrap(), vec);
	assert_eq!(ints(&mut engine, vec), vec![3, 2, 1]);

	let text = engine.provide_string("abc");
	let backwards = engine.reverse(text, false).unwrap();
	assert_eq!(engine.as_str(backwards).unwrap(), "cba");
}

#[test]
fn set_algebra_on_sequences() {
	let mut engine = Engine::new();

	let left = engine.provide_integers(&[1, 2, 2, 3]);
	let right = engine.provide_integers(&[3, 4, 1]);

	let and = engine.and(left, right).unwrap();
	let or = engine.or(left, right).unwrap();
	let xor = engine.xor(left, right).unwrap();
	assert_eq!(ints(&mut engine, and), vec![1, 3]);
	assert_eq!(ints(&mut engine, or), vec![1, 2, 3, 4]);
	assert_eq!(ints(&mut engine, xor), vec![2, 4]);

	let unique = engine.unique(left).unwrap();
	assert_eq!(ints(&mut engine, unique), vec![1, 2, 3]);

	let text = engine.provide_string("not a sequence");
	assert!(engine.and(left, text).unwrap_err().is_type_mismatch());
}

#[test]
fn set_algebra_skips_elements_the_left_kind_cant_hold() {
	let mut engine = Engine::new();

	let left = engine.provide_integers(&[1, 2]);
	let (a, one) = (engine.provide_string("a"), engine.provide_integer(1));
	let inner = engine.provide_integers(&[2]);
	let right = engine.provide_values(&[a, one, inner]);

	let and = engine.and(left, right).unwrap();
	assert_eq!(engine.kind(and), Kind::Integers);
	assert_eq!(ints(&mut engine, and), vec![1]);

	let or = engine.or(left, right).unwrap();
	assert_eq!(ints(&mut engine, or), vec![1, 2]);

	let xor = engine.xor(left, right).unwrap();
	assert_eq!(ints(&mut engine, xor), vec![2]);

	//a generic left operand holds anything
	let and = engine.and(right, left).unwrap();
	assert_eq!(engine.as_string(and), "(1)");
}
