//! Shared vector math for word-vector composition.

/// L2-normalize a vector in place so its magnitude is 1.
///
/// Zero vectors are left untouched.
pub fn l2_normalize_in_place(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Element-wise mean of equally sized vectors; `None` when there are none.
pub fn mean<'a, I>(vectors: I, dim: usize) -> Option<Vec<f32>>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut sum = vec![0.0f32; dim];
    let mut count = 0usize;
    for v in vectors {
        for (acc, x) in sum.iter_mut().zip(v) {
            *acc += x;
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    for acc in sum.iter_mut() {
        *acc /= count as f32;
    }
    Some(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_l2_normalize_in_place() {
        let mut v = vec![3.0, 4.0];
        l2_normalize_in_place(&mut v);
        assert_relative_eq!(v[0], 0.6, epsilon = 1e-6);
        assert_relative_eq!(v[1], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize_in_place(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_mean() {
        let a = [1.0f32, 0.0];
        let b = [0.0f32, 3.0];
        let m = mean([&a[..], &b[..]], 2).unwrap();
        assert_eq!(m, vec![0.5, 1.5]);
    }

    #[test]
    fn test_mean_of_nothing() {
        assert!(mean(std::iter::empty::<&[f32]>(), 4).is_none());
    }
}
