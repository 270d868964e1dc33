#[test]
fn test_simple() {
    assert_eq!(empty(), "The world is big"); // [Miss] The table is empty.
    assert_eq!(empty(), "The world is big"); // [Hit] Always a hit from now on.

    assert_eq!(double(2), 4); // [Miss] The table is empty.
    assert_eq!(double(4), 8); // [Miss] Different number.
    assert_eq!(double(2), 4); // [Hit] Same number as initially.

    assert_eq!(sum(2, 4), 6); // [Miss] The table is empty.
    assert_eq!(sum(2, 3), 5); // [Miss] Different numbers.
    assert_eq!(sum(2, 3), 5); // [Hit]  Same numbers
    assert_eq!(sum(4, 2), 6); // [Miss] Different numbers.
}

/// Build a string.
#[memotable::memoize]
fn empty() -> String {
    format!("The world is {}", "big")
}

/// Double a number.
#[memotable::memoize]
fn double(x: u32) -> u32 {
    2 * x
}

/// Compute the sum of two numbers.
#[memotable::memoize]
fn sum(a: u32, b: u32) -> u32 {
    a + b
}
