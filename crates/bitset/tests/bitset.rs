use rabbet_bitset::DenseBitSet;

fn set_of(capacity: u32, members: &[u32]) -> DenseBitSet {
    let mut set = DenseBitSet::with_capacity(capacity);
    for &m in members {
        set.insert(m);
    }
    set
}

#[test]
fn contains() {
    let set = set_of(200, &[0, 1, 63, 64, 127, 128, 199]);
    for i in [0, 1, 63, 64, 127, 128, 199] {
        assert!(set.contains(i));
    }
    for i in [2, 62, 65, 126, 129, 198] {
        assert!(!set.contains(i));
    }
    assert_eq!(set.len(), 7);
}

#[test]
fn iteration_is_ascending() {
    let members = [5, 7, 8, 70, 71, 190];
    let set = set_of(191, &members);
    assert_eq!(set.iter().collect::<Vec<_>>(), members);
}

#[test]
fn ordering_is_total_and_numeric() {
    // As integers: {} < {0} < {1} < {0, 1} < {90} regardless of how the
    // members spread over words.
    let empty = set_of(91, &[]);
    let zero = set_of(91, &[0]);
    let one = set_of(91, &[1]);
    let both = set_of(91, &[0, 1]);
    let high = set_of(91, &[90]);

    assert!(empty < zero);
    assert!(zero < one);
    assert!(one < both);
    assert!(both < high);
    assert!(zero < high);
    assert_eq!(high.cmp(&high), std::cmp::Ordering::Equal);
}

#[test]
fn union_difference_intersection() {
    let a = set_of(130, &[1, 64, 129]);
    let b = set_of(130, &[2, 64]);

    let mut u = a.clone();
    u.union_with(&b);
    assert_eq!(u.iter().collect::<Vec<_>>(), [1, 2, 64, 129]);

    let mut d = a.clone();
    d.difference_with(&b);
    assert_eq!(d.iter().collect::<Vec<_>>(), [1, 129]);

    assert!(a.intersects(&b));
    assert!(!d.intersects(&b));
}

#[test]
#[should_panic]
fn out_of_range_is_rejected() {
    let mut set = DenseBitSet::with_capacity(8);
    set.insert(8);
}
