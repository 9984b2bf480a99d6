
/* Pairs every local maximum of a 1-D signal with the local minimum that kills
its connected component, sweeping sample indices from the highest value to the
lowest and merging adjacent components with a union-find.  A component is born
at a local maximum; when two components meet at a low point, the one with the
smaller birth value dies there and the pair (max, min) is emitted.  The global
maximum survives the whole sweep and is paired with the global minimum. */

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairedExtremum {
	pub max_idx: usize,
	pub min_idx: usize,
	pub persistence: f64,
}

struct Components {
	parent: Vec<usize>,
	// Index of the birth maximum for the component rooted at each index
	birth: Vec<usize>,
}

impl Components {

	fn new(n:usize) -> Self {
		Components{ parent: (0..n).collect(), birth: (0..n).collect() }
	}

	fn find(&mut self, mut i:usize) -> usize {
		while self.parent[i] != i {
			self.parent[i] = self.parent[self.parent[i]];
			i = self.parent[i];
		}
		i
	}

	fn union(&mut self, child:usize, root:usize) {
		let child_root = self.find(child);
		self.parent[child_root] = root;
	}

}

/// Returns all paired extrema whose persistence (max minus min) is strictly
/// greater than `min_persistence`, sorted by descending persistence.
pub fn paired_maxima(data:&[f64], min_persistence:f64) -> Vec<PairedExtremum> {
	let n = data.len();
	if n == 0 { return vec![]; }

	// Sample indices from the highest value down; ties break on index so the
	// result is deterministic
	let mut order:Vec<usize> = (0..n).collect();
	order.sort_by(|&a, &b| data[b].partial_cmp(&data[a]).unwrap_or(std::cmp::Ordering::Equal).then(a.cmp(&b)));

	let mut comps = Components::new(n);
	let mut visited:Vec<bool> = vec![false; n];
	let mut pairs:Vec<PairedExtremum> = vec![];

	for &idx in &order {
		visited[idx] = true;

		let left  = if idx > 0   && visited[idx-1] { Some(comps.find(idx-1)) } else { None };
		let right = if idx+1 < n && visited[idx+1] { Some(comps.find(idx+1)) } else { None };

		match (left, right) {
			(None, None) => {
				// A new component is born at this index, which is a local max
				// of everything seen so far
				comps.birth[idx] = idx;
			},
			(Some(root), None) | (None, Some(root)) => {
				comps.union(idx, root);
			},
			(Some(l_root), Some(r_root)) => {
				// This index is the saddle between two components; the one
				// with the smaller birth maximum dies here
				let (survivor, dying) = if data[comps.birth[l_root]] >= data[comps.birth[r_root]] {
					(l_root, r_root)
				} else {
					(r_root, l_root)
				};
				let max_idx = comps.birth[dying];
				pairs.push(PairedExtremum{ max_idx, min_idx: idx, persistence: data[max_idx] - data[idx] });
				comps.union(dying, survivor);
				comps.union(idx, survivor);
			},
		}
	}

	// The global maximum never merges into anything; pair it with the global
	// minimum, which is the last index visited
	if let (Some(&first), Some(&last)) = (order.first(), order.last()) {
		pairs.push(PairedExtremum{ max_idx: first, min_idx: last, persistence: data[first] - data[last] });
	}

	pairs.retain(|p| p.persistence > min_persistence);
	pairs.sort_by(|a, b| b.persistence.partial_cmp(&a.persistence).unwrap_or(std::cmp::Ordering::Equal));
	pairs
}
