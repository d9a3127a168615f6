//! Connected-component labelling of binary masks
//!
//! Components are numbered from 1 in the raster order of their first voxel
//! (depth slowest, width fastest); label 0 is background.

use ndarray::{Array3, ArrayView3};
use std::collections::VecDeque;

/// Which neighbouring voxels count as adjacent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Connectivity {
    /// Voxels sharing a face (6 neighbours)
    Faces,
    /// Voxels sharing a face, edge or corner (26 neighbours)
    #[default]
    Full,
}

impl Connectivity {
    /// Offsets to every neighbour under this connectivity
    pub fn offsets(self) -> Vec<[isize; 3]> {
        let mut offsets = Vec::with_capacity(26);
        for dz in -1..=1_isize {
            for dy in -1..=1_isize {
                for dx in -1..=1_isize {
                    let distance = dz.abs() + dy.abs() + dx.abs();
                    let adjacent = match self {
                        Self::Faces => distance == 1,
                        Self::Full => distance > 0,
                    };
                    if adjacent {
                        offsets.push([dz, dy, dx]);
                    }
                }
            }
        }
        offsets
    }
}

/// Labelled components of a binary mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Components {
    labels: Array3<u32>,
    sizes: Vec<usize>,
}

impl Components {
    /// Per-voxel labels; 0 is background, components start at 1
    pub const fn labels(&self) -> &Array3<u32> {
        &self.labels
    }

    /// Voxel count of each component, indexed by `label - 1`
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Number of components found
    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    /// Label of the largest component
    ///
    /// Ties go to the lowest label. `None` when the mask had no foreground.
    pub fn largest_label(&self) -> Option<u32> {
        self.sizes
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
            .map(|(index, _)| index as u32 + 1)
    }

    /// Mask holding only the largest component
    ///
    /// All background when there are no components.
    pub fn largest(&self) -> Array3<bool> {
        match self.largest_label() {
            Some(label) => self.labels.mapv(|l| l == label),
            None => Array3::from_elem(self.labels.raw_dim(), false),
        }
    }
}

/// Label the connected foreground regions of `mask`
pub fn connected_components(mask: ArrayView3<'_, bool>, connectivity: Connectivity) -> Components {
    let (depth, height, width) = mask.dim();
    let offsets = connectivity.offsets();
    let mut labels = Array3::<u32>::zeros((depth, height, width));
    let mut sizes = Vec::new();
    let mut queue = VecDeque::new();

    for ((z, y, x), &foreground) in mask.indexed_iter() {
        if !foreground || labels.get([z, y, x]).copied().unwrap_or(0) != 0 {
            continue;
        }

        let label = sizes.len() as u32 + 1;
        let mut size = 0usize;
        if let Some(slot) = labels.get_mut([z, y, x]) {
            *slot = label;
        }
        queue.push_back([z, y, x]);

        while let Some(voxel) = queue.pop_front() {
            size += 1;
            for offset in &offsets {
                let Some(neighbour) = step(voxel, *offset, [depth, height, width]) else {
                    continue;
                };
                if !mask.get(neighbour).copied().unwrap_or(false) {
                    continue;
                }
                if let Some(slot) = labels.get_mut(neighbour) {
                    if *slot == 0 {
                        *slot = label;
                        queue.push_back(neighbour);
                    }
                }
            }
        }

        sizes.push(size);
    }

    Components { labels, sizes }
}

/// Keep only the largest connected component of `mask`
pub fn largest_connected_component(
    mask: ArrayView3<'_, bool>,
    connectivity: Connectivity,
) -> Array3<bool> {
    connected_components(mask, connectivity).largest()
}

fn step(voxel: [usize; 3], offset: [isize; 3], shape: [usize; 3]) -> Option<[usize; 3]> {
    let z = voxel[0].checked_add_signed(offset[0])?;
    let y = voxel[1].checked_add_signed(offset[1])?;
    let x = voxel[2].checked_add_signed(offset[2])?;
    (z < shape[0] && y < shape[1] && x < shape[2]).then_some([z, y, x])
}
