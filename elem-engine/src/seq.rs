use super::error::EResult;
use std::mem;
use std::ops::Range;

/*

generic algorithms shared by every vector kind and by the cons list. nothing in this module knows
about the Engine: elements are plain Rust values, and comparisons are supplied by the caller.

the Engine-level operations in collections.rs and list.rs copy a sequence's elements out, run one
of these algorithms, and then write the result back. this keeps comparator failures from leaving
a sequence half-sorted.

*/

//-------------------------------------------------------------------------------------------------
// sorting
//-------------------------------------------------------------------------------------------------

//ranges shorter than this are bubble-sorted
const SMALL_SORT: usize = 7;

/**
Sorts `items` in place, using `less` as a strict ordering.

Before anything is reordered, `less(items[0], items[0])` is evaluated; if it returns `true`, the
comparator isn't strict and a contract error is returned. If `less` itself fails, the error is
returned immediately, and `items` may be partially reordered.
*/
pub fn quicksort<T, F>(items: &mut [T], less: &mut F) -> EResult<()>
where
	F: FnMut(&T, &T) -> EResult<bool>
{
	if items.len() < 2 {
		return Ok(())
	}

	ensure!(
		!less(&items[0], &items[0])?,
		Contract,
		"the sort comparator returned true when comparing a value with itself"
	);

	sort_range(items, less)
}

fn sort_range<T, F>(mut items: &mut [T], less: &mut F) -> EResult<()>
where
	F: FnMut(&T, &T) -> EResult<bool>
{
	//recurse on the smaller partition and loop on the larger one, so that the stack depth is
	//logarithmic even for adversarial input
	loop {
		if items.len() < SMALL_SORT {
			return small_sort(items, less)
		}

		let pivot = partition(items, less)?;
		let (left, right) = mem::take(&mut items).split_at_mut(pivot);
		let right = &mut right[1..];

		if left.len() < right.len() {
			sort_range(left, less)?;
			items = right;
		} else {
			sort_range(right, less)?;
			items = left;
		}
	}
}

//single pivot, the last element
fn partition<T, F>(items: &mut [T], less: &mut F) -> EResult<usize>
where
	F: FnMut(&T, &T) -> EResult<bool>
{
	let last = items.len() - 1;
	let mut store = 0;
	for i in 0 .. last {
		if less(&items[i], &items[last])? {
			items.swap(i, store);
			store += 1;
		}
	}

	items.swap(store, last);
	Ok(store)
}

fn small_sort<T, F>(items: &mut [T], less: &mut F) -> EResult<()>
where
	F: FnMut(&T, &T) -> EResult<bool>
{
	let mut swap_if = |items: &mut [T], i: usize, j: usize| -> EResult<bool> {
		if less(&items[j], &items[i])? {
			items.swap(i, j);
			Ok(true)
		} else {
			Ok(false)
		}
	};

	match items.len() {
		0 | 1 => (),
		2 => {
			swap_if(items, 0, 1)?;
		}
		3 => {
			swap_if(items, 0, 1)?;
			swap_if(items, 1, 2)?;
			swap_if(items, 0, 1)?;
		}
		len => {
			for end in (1 .. len).rev() {
				let mut swapped = false;
				for i in 0 .. end {
					swapped |= swap_if(items, i, i + 1)?;
				}

				if !swapped {
					break
				}
			}
		}
	}

	Ok(())
}

//-------------------------------------------------------------------------------------------------
// set algebra, uniqueness
//-------------------------------------------------------------------------------------------------

///Which of the three set operations to perform.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SetOp {
	And,
	Or,
	Xor
}

fn push_unseen<T, F>(out: &mut Vec<T>, item: &T, eq: &mut F)
where
	T: Clone,
	F: FnMut(&T, &T) -> bool
{
	if !out.iter().any(|seen| eq(seen, item)) {
		out.push(item.clone());
	}
}

/**
Combines two sequences as sets. The result lists elements in the order they're first seen,
scanning `left` and then `right`, with duplicates removed.
*/
pub fn set_op<T, F>(op: SetOp, left: &[T], right: &[T], mut eq: F) -> Vec<T>
where
	T: Clone,
	F: FnMut(&T, &T) -> bool
{
	let mut out = Vec::new();
	match op {
		SetOp::Or => {
			for item in left.iter().chain(right) {
				push_unseen(&mut out, item, &mut eq);
			}
		}
		SetOp::And => {
			for item in left {
				if right.iter().any(|other| eq(item, other)) {
					push_unseen(&mut out, item, &mut eq);
				}
			}
		}
		SetOp::Xor => {
			for item in left {
				if !right.iter().any(|other| eq(item, other)) {
					push_unseen(&mut out, item, &mut eq);
				}
			}
			for item in right {
				if !left.iter().any(|other| eq(item, other)) {
					push_unseen(&mut out, item, &mut eq);
				}
			}
		}
	}

	out
}

///Removes duplicates, keeping the first occurrence of each element.
pub fn unique<T, F>(items: &[T], mut eq: F) -> Vec<T>
where
	T: Clone,
	F: FnMut(&T, &T) -> bool
{
	let mut out = Vec::with_capacity(items.len());
	for item in items {
		push_unseen(&mut out, item, &mut eq);
	}
	out
}

//-------------------------------------------------------------------------------------------------
// search
//-------------------------------------------------------------------------------------------------

//negative indices count back from the end. unlike slice bounds, indices are never clamped.
pub(crate) fn resolve_index(i: i64, len: usize) -> EResult<usize> {
	let resolved = if i < 0 { len as i64 + i } else { i };
	ensure!(
		resolved >= 0 && (resolved as usize) < len,
		Index,
		"index {} is out of bounds for a sequence of length {}",
		i,
		len
	);

	Ok(resolved as usize)
}

//an insertion point, from 0 to len inclusive. -1 is the end of the sequence.
pub(crate) fn resolve_insertion(i: i64, len: usize) -> EResult<usize> {
	let resolved = if i < 0 { len as i64 + 1 + i } else { i };
	ensure!(
		resolved >= 0 && (resolved as usize) <= len,
		Index,
		"insertion point {} is out of bounds for a sequence of length {}",
		i,
		len
	);

	Ok(resolved as usize)
}

pub fn find_all<T, F>(items: &[T], mut matches: F) -> Vec<usize>
where
	F: FnMut(&T) -> bool
{
	items.iter().enumerate().filter(|(_, item)| matches(item)).map(|(i, _)| i).collect()
}

///Rotates by one position: the last element moves to the front when `right` is true, and the
///first element moves to the back otherwise.
pub fn rotate<T>(items: &mut [T], right: bool) {
	if items.len() > 1 {
		if right {
			items.rotate_right(1);
		} else {
			items.rotate_left(1);
		}
	}
}

//-------------------------------------------------------------------------------------------------
// slice bounds
//-------------------------------------------------------------------------------------------------

/**
One end of an [`extract`](struct.Engine.html#method.extract) range.
*/

#[derive(Clone, PartialEq, Debug)]
pub enum SliceBound {
	///A position. Negative positions count back from the end, and positions outside the
	///sequence are clamped.
	Index(i64),

	///The position of a matching substring or element.
	Anchor(Anchor)
}

/**
A search target used as a slice bound.

By default, the first match is searched for, and the match itself is excluded from the slice.
*/

#[derive(Clone, PartialEq, Debug)]
pub struct Anchor {
	pub needle: String,

	///Search for the last match rather than the first.
	pub backward: bool,

	///Include the match itself in the slice.
	pub inclusive: bool
}

impl Anchor {
	pub fn new(needle: &str) -> Anchor {
		Anchor {
			needle: needle.to_string(),
			backward: false,
			inclusive: false
		}
	}

	/**
	Parses the textual form of an anchor. A leading `-` searches backward, and a leading `+`
	includes the match. The two prefixes may be combined in either order.

		assert_eq!(Anchor::parse("+-ab"), Anchor { needle: "ab".into(), backward: true, inclusive: true });
	*/
	pub fn parse(text: &str) -> Anchor {
		let mut anchor = Anchor::new("");
		let mut rest = text;

		for _ in 0 .. 2 {
			if !anchor.backward && rest.starts_with('-') {
				anchor.backward = true;
				rest = &rest[1..];
			} else if !anchor.inclusive && rest.starts_with('+') {
				anchor.inclusive = true;
				rest = &rest[1..];
			}
		}

		anchor.needle = rest.to_string();
		anchor
	}
}

impl From<i64> for SliceBound {
	fn from(i: i64) -> SliceBound {
		SliceBound::Index(i)
	}
}

impl From<Anchor> for SliceBound {
	fn from(anchor: Anchor) -> SliceBound {
		SliceBound::Anchor(anchor)
	}
}

/**
A sequence which can be searched for anchors.

`match_at` returns the end of the match when `needle` matches at position `at`.
*/
pub(crate) trait Haystack {
	fn len(&self) -> usize;
	fn match_at(&self, needle: &str, at: usize) -> Option<usize>;

	fn search(&self, anchor: &Anchor, from: usize) -> Option<(usize, usize)> {
		let hits = (from ..= self.len()).filter_map(|at| {
			self.match_at(&anchor.needle, at).map(|end| (at, end))
		});

		if anchor.backward {
			hits.last()
		} else {
			let mut hits = hits;
			hits.next()
		}
	}
}

//a string, indexed by code point
impl Haystack for [char] {
	fn len(&self) -> usize {
		<[char]>::len(self)
	}

	fn match_at(&self, needle: &str, at: usize) -> Option<usize> {
		let mut end = at;
		for c in needle.chars() {
			if self.get(end) != Some(&c) {
				return None
			}
			end += 1;
		}

		Some(end)
	}
}

//a sequence of elements, some of which are strings
impl<S: AsRef<str>> Haystack for [Option<S>] {
	fn len(&self) -> usize {
		<[Option<S>]>::len(self)
	}

	fn match_at(&self, needle: &str, at: usize) -> Option<usize> {
		match self.get(at) {
			Some(Some(text)) if text.as_ref() == needle => Some(at + 1),
			_ => None
		}
	}
}

fn clamp_index(i: i64, len: usize) -> usize {
	if i < 0 {
		(len as i64 + i).max(0) as usize
	} else {
		(i as usize).min(len)
	}
}

/**
Resolves a pair of slice bounds against a sequence of length `len`.

Returns `Ok(None)` when the slice is empty, including when an anchor isn't found. Passing an
anchor when `hay` is `None` is an index error.
*/
pub(crate) fn resolve_slice<H: Haystack + ?Sized>(
	hay: Option<&H>,
	len: usize,
	from: &SliceBound,
	to: Option<&SliceBound>
) -> EResult<Option<Range<usize>>> {
	let search = |anchor: &Anchor, start: usize| -> EResult<Option<(usize, usize)>> {
		match hay {
			Some(hay) => Ok(hay.search(anchor, start)),
			None => bail!(Index, "malformed slice bound: {:?} can only search strings", anchor.needle)
		}
	};

	let start = match from {
		SliceBound::Index(i) => clamp_index(*i, len),
		SliceBound::Anchor(anchor) => match search(anchor, 0)? {
			Some((at, end)) => if anchor.inclusive { at } else { end },
			None => return Ok(None)
		}
	};

	let end = match to {
		None => len,
		Some(SliceBound::Index(i)) => clamp_index(*i, len),
		Some(SliceBound::Anchor(anchor)) => match search(anchor, start)? {
			Some((at, end)) => if anchor.inclusive { end } else { at },
			None => return Ok(None)
		}
	};

	if start < end {
		Ok(Some(start .. end))
	} else {
		Ok(None)
	}
}
