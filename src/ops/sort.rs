use crate::dataset::Dataset;
use crate::operation::{SortDirection, SortSpec};
use crate::value::Cell;
use std::cmp::Ordering;

/// Stable bottom-up merge sort.
///
/// `compare` may be inconsistent (mixed-type cells are not totally ordered); the result is then
/// some permutation of the input, never a panic. Equal elements keep their input order.
pub fn stable_sort_by<T, F>(items: Vec<T>, mut compare: F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let len = items.len();
    let mut order: Vec<usize> = (0..len).collect();
    let mut buffer = vec![0usize; len];
    let mut width = 1;
    while width < len {
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            let (mut i, mut j, mut k) = (start, mid, start);
            while i < mid && j < end {
                // Take from the right run only when strictly smaller
                if compare(&items[order[j]], &items[order[i]]) == Ordering::Less {
                    buffer[k] = order[j];
                    j += 1;
                } else {
                    buffer[k] = order[i];
                    i += 1;
                }
                k += 1;
            }
            buffer[k..k + (mid - i)].copy_from_slice(&order[i..mid]);
            k += mid - i;
            buffer[k..end].copy_from_slice(&order[j..end]);
            start = end;
        }
        std::mem::swap(&mut order, &mut buffer);
        width *= 2;
    }

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    order.into_iter().filter_map(|i| slots[i].take()).collect()
}

fn compare_rows(a: &[Cell], b: &[Cell], keys: &[(usize, SortDirection)]) -> Ordering {
    for &(index, direction) in keys {
        let ordering = if a[index].js_lt(&b[index]) {
            Ordering::Less
        } else if b[index].js_lt(&a[index]) {
            Ordering::Greater
        } else {
            continue;
        };
        return match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
    }
    Ordering::Equal
}

/// Orders data rows by the listed columns, first column first.
///
/// Columns missing from the header are skipped.
pub fn apply_sort(dataset: &Dataset, spec: &SortSpec) -> Dataset {
    let keys: Vec<(usize, SortDirection)> = spec
        .columns
        .iter()
        .enumerate()
        .filter_map(|(k, name)| match dataset.column_index(name) {
            Some(index) => Some((index, spec.direction(k))),
            None => {
                log::debug!("sort column `{name}` not found, ignoring it");
                None
            }
        })
        .collect();
    if keys.is_empty() {
        return dataset.clone();
    }
    let rows = stable_sort_by(dataset.rows().to_vec(), |a, b| compare_rows(a, b, &keys));
    dataset.with_rows(rows)
}
