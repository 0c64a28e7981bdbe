use elem::prelude::*;

fn checked_sum(engine: &mut Engine, seq: Val) -> EResult<i64> {
	ensure!(engine.kind(seq).is_sequence(), TypeMismatch, "expected a sequence");

	let mut sum = 0i64;
	for i in 0 .. engine.size(seq)? {
		let item = engine.index(seq, i as i64)?;
		sum = match sum.checked_add(engine.as_integer(item)?) {
			Some(sum) => sum,
			None => bail!(Consistency, "overflow after {} elements", i)
		};
	}

	Ok(sum)
}

#[test]
fn the_prelude_covers_everyday_use() {
	let mut engine = EngineBuilder::new().pool_limit(64).build();

	let vec = engine.provide_shorts(&[1, 2, 3]);
	assert_eq!(checked_sum(&mut engine, vec).unwrap(), 6);

	let big = engine.provide_integers(&[i64::MAX, 1]);
	let err = checked_sum(&mut engine, big).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Consistency);
	assert_eq!(err.message(), "overflow after 1 elements");

	let text = engine.provide_string("abc");
	assert!(checked_sum(&mut engine, text).unwrap_err().is_type_mismatch());
	assert_eq!(format!("{}", engine.display(vec)), "(1 2 3)");
}
