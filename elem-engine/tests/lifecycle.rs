use elem_engine::{EngineBuilder, Engine, Kind, Status};
use fnv::FnvHashSet;
use std::thread;

#[test]
fn increment_then_decrement_restores_status() {
	let mut engine = Engine::new();

	let vec = engine.provide_integers(&[1, 2, 3]);
	let list = engine.provide_list(&[vec]);
	engine.increment(list);

	for &val in &[vec, list] {
		let before = engine.status(val);
		engine.increment(val);
		engine.decrement(val);
		assert_eq!(engine.status(val), before);
		assert!(engine.is_live(val));
	}
}

#[test]
fn temporaries_are_reclaimed_by_release() {
	let mut engine = Engine::new();

	let text = engine.provide_string("temporary");
	assert_eq!(engine.status(text), Status::DESTRUCTIBLE);
	engine.release(text);
	assert!(!engine.is_live(text));

	let owned = engine.provide_string("owned");
	engine.increment(owned);
	engine.release(owned);
	assert!(engine.is_live(owned));
	engine.decrement(owned);
	assert!(!engine.is_live(owned));
}

#[test]
fn reclaiming_a_container_releases_its_children() {
	let mut engine = Engine::new();

	let inner = engine.provide_integers(&[1]);
	let shared = engine.provide_integers(&[2]);
	engine.increment(shared);

	let outer = engine.provide_values(&[inner, shared]);
	engine.release(outer);

	assert!(!engine.is_live(outer));
	assert!(!engine.is_live(inner));
	assert!(engine.is_live(shared));
	assert_eq!(engine.status(shared).count(), Some(1));
}

#[test]
fn released_instances_are_reused() {
	let mut engine = Engine::new();

	let first = engine.provide_integers(&[1, 2, 3]);
	engine.release(first);

	let stats = engine.stats();
	assert_eq!(stats.kind(Kind::Integers).pooled, 1);
	let fresh = stats.kind(Kind::Integers).fresh;

	let second = engine.provide_integers(&[4]);
	assert_eq!(second, first);
	assert_eq!(engine.size(second).unwrap(), 1);

	let stats = engine.stats();
	assert_eq!(stats.kind(Kind::Integers).pooled, 0);
	assert_eq!(stats.kind(Kind::Integers).fresh, fresh);
}

#[test]
fn plain_instances_are_not_pooled() {
	let mut engine = Engine::new();

	let plain = engine.new_values(&[]);
	engine.release(plain);
	assert_eq!(engine.stats().kind(Kind::Values).pooled, 0);

	let mut unpooled = EngineBuilder::new().pooling(false).build();
	let val = unpooled.provide_values(&[]);
	unpooled.release(val);
	assert_eq!(unpooled.stats().pooled, 0);
}

#[test]
fn pools_are_bounded() {
	let mut engine = EngineBuilder::new().pool_limit(2).build();

	let vals: Vec<_> = (0 .. 5).map(|i| engine.provide_number(i as f64)).collect();
	for val in vals {
		engine.release(val);
	}

	assert_eq!(engine.stats().kind(Kind::Number).pooled, 2);
}

#[test]
fn small_integer_literals_are_constants() {
	let mut engine = EngineBuilder::new().small_int_cache(0 ..= 9).build();

	let seven = engine.int_literal(7);
	assert_eq!(engine.int_literal(7), seven);
	assert_eq!(engine.status(seven), Status::CONSTANT);

	let large = engine.int_literal(10);
	assert_eq!(engine.status(large), Status::DESTRUCTIBLE);
}

#[test]
fn protection_covers_current_entries() {
	let mut engine = Engine::new();

	let inner = engine.provide_integers(&[1]);
	let outer = engine.provide_values(&[inner]);
	engine.protect(outer);
	assert!(engine.status(outer).is_protected());
	assert!(engine.status(inner).is_protected());

	engine.decrement(outer);
	assert!(engine.is_live(outer));

	engine.unprotect(outer);
	assert_eq!(engine.status(outer), Status::DESTRUCTIBLE);
	assert_eq!(engine.status(inner).count(), Some(1));

	engine.release(outer);
	assert!(!engine.is_live(inner));
}

#[test]
fn constants_survive_everything() {
	let mut engine = Engine::new();

	let vec = engine.provide_strings(&["a", "b"]);
	engine.make_constant(vec);
	engine.decrement(vec);
	engine.release(vec);
	assert!(engine.is_live(vec));

	//mutating a constant works on a copy
	let item = engine.provide_string("c");
	let appended = engine.append(vec, item).unwrap();
	assert_ne!(appended, vec);
	assert_eq!(engine.size(vec).unwrap(), 2);
	assert_eq!(engine.size(appended).unwrap(), 3);
}

#[test]
fn collector_reclaims_unreachable_protected_values() {
	let mut engine = Engine::new();

	let kept_leaf = engine.provide_string("kept");
	let kept = engine.provide_values(&[kept_leaf]);
	let lost_leaf = engine.provide_string("lost");
	let lost = engine.provide_values(&[lost_leaf]);
	engine.protect(kept);
	engine.protect(lost);

	let mut reachable = FnvHashSet::default();
	engine.garbaging_values(kept, &mut reachable);
	assert!(reachable.contains(&kept_leaf));
	assert!(!reachable.contains(&lost));

	assert_eq!(engine.collect_protected(&[kept]), 2);
	assert!(engine.is_live(kept));
	assert!(engine.is_live(kept_leaf));
	assert!(!engine.is_live(lost));
	assert!(!engine.is_live(lost_leaf));
}

#[test]
fn scoped_cleanup_releases_partial_results() {
	let mut engine = Engine::new();
	let baseline = engine.stats().live;

	let one = engine.provide_integer(1);
	let text = engine.provide_string("not a number");
	let items = engine.provide_values(&[one, text]);
	engine.increment(items);
	let with_items = engine.stats().live;

	let result = engine.scoped(|engine, temps| {
		let sum = temps.hold(engine.provide_integers(&[]));
		let values = engine.provide_values(&[]);
		temps.scratch(values);
		for i in 0 .. engine.size(items)? {
			let item = engine.index(items, i as i64)?;
			engine.append(sum, item)?;
		}
		Ok(sum)
	});

	assert!(result.unwrap_err().is_type_mismatch());
	assert_eq!(engine.stats().live, with_items);

	engine.decrement(items);
	assert_eq!(engine.stats().live, baseline);
}

#[test]
fn parcels_move_values_between_threads() {
	let mut engine = Engine::new();

	let one = engine.provide_integer(1);
	let two = engine.provide_string("two");
	let three = engine.provide_integers(&[3]);
	let list = engine.provide_list(&[one, two, three]);
	engine.list_link_tail(list, 1).unwrap();

	let parcel = engine.pack(list);
	assert!(engine.is_live(list));

	let printed = thread::spawn(move || {
		let mut other = Engine::new();
		let val = other.unpack(parcel);
		assert!(other.list_is_cyclic(val).unwrap());
		other.as_string(val)
	}).join().unwrap();

	assert_eq!(printed, engine.as_string(list));
	assert_eq!(printed, "(1 \"two\" (3) ...)");
}

#[test]
#[should_panic(expected = "was passed to engine")]
fn foreign_handles_are_rejected() {
	let mut a = Engine::new();
	let b = Engine::new();
	let val = a.provide_integer(1);
	b.status(val);
}
