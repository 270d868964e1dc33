//! Run with `cargo test --all-features`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use memotable::{memoize, HeteroMemoTable, MemoTable, Tag};

macro_rules! test {
    (miss: $call:expr, $result:expr) => {{
        assert_eq!($call, $result);
        assert!(!memotable::internal::last_was_hit());
    }};
    (hit: $call:expr, $result:expr) => {{
        assert_eq!($call, $result);
        assert!(memotable::internal::last_was_hit());
    }};
}

/// Test basic memoization.
#[test]
fn test_basic() {
    #[memoize]
    fn empty() -> String {
        format!("The world is {}", "big")
    }

    #[memoize]
    fn double(x: u32) -> u32 {
        2 * x
    }

    #[memoize]
    fn sum(a: u32, b: u32) -> u32 {
        a + b
    }

    #[memoize]
    fn fib(n: u32) -> u32 {
        if n <= 2 {
            1
        } else {
            fib(n - 1) + fib(n - 2)
        }
    }

    #[memoize]
    fn sum_iter(n: u32) -> u32 {
        (0..n).sum()
    }

    test!(miss: empty(), "The world is big");
    test!(hit: empty(), "The world is big");
    test!(hit: empty(), "The world is big");

    test!(miss: double(2), 4);
    test!(miss: double(4), 8);
    test!(hit: double(2), 4);

    test!(miss: sum(2, 4), 6);
    test!(miss: sum(2, 3), 5);
    test!(hit: sum(2, 3), 5);
    test!(miss: sum(4, 2), 6);

    test!(miss: fib(5), 5);
    test!(hit: fib(3), 2);
    test!(miss: fib(8), 21);
    test!(hit: fib(7), 13);

    test!(miss: sum_iter(1000), 499500);
    test!(hit: sum_iter(1000), 499500);
}

/// Test that owned, non-copy arguments work as keys.
#[test]
fn test_owned_arguments() {
    #[memoize]
    fn shout(text: String, times: usize) -> String {
        text.to_uppercase().repeat(times)
    }

    test!(miss: shout("hi".into(), 2), "HIHI");
    test!(hit: shout("hi".into(), 2), "HIHI");
    test!(miss: shout("hi".into(), 3), "HIHIHI");
    test!(miss: shout("ho".into(), 2), "HOHO");
}

/// Test that a memoized function runs once across threads.
#[test]
fn test_memoize_across_threads() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);

    #[memoize]
    fn slow(x: u64) -> u64 {
        CALLS.fetch_add(1, Ordering::SeqCst);
        thread::sleep(std::time::Duration::from_millis(20));
        x * x
    }

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| assert_eq!(slow(12), 144));
        }
    });

    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    test!(hit: slow(12), 144);
}

/// Test hit and miss reporting of the tables themselves.
#[test]
fn test_tables() {
    const WORDS: Tag<u8, &'static str> = Tag::new("words");

    let table = MemoTable::new();
    test!(miss: table.memoize(1, || "one"), "one");
    test!(hit: table.memoize(1, || "uno"), "one");
    test!(miss: table.try_memoize(2, || Ok::<_, ()>("two")), Ok("two"));
    test!(hit: table.try_memoize(2, || Err(())), Ok("two"));

    let hetero = HeteroMemoTable::new();
    test!(miss: hetero.memoize(&WORDS, 1, || "one"), "one");
    test!(hit: hetero.memoize(&WORDS, 1, || "eins"), "one");

    hetero.load_map(&WORDS, [(3, "three")]);
    test!(hit: hetero.memoize(&WORDS, 3, || "drei"), "three");
}

/// Test that a failed computation counts as a miss.
#[test]
fn test_failure_is_miss() {
    let table = MemoTable::<u8, u8>::new();
    test!(miss: table.memoize(1, || 1), 1);
    test!(hit: table.memoize(1, || 2), 1);
    test!(miss: table.try_memoize(2, || Err("broken")), Err("broken"));
    test!(hit: table.memoize(1, || 3), 1);
    test!(miss: table.try_memoize(2, || Err("still broken")), Err("still broken"));
}
