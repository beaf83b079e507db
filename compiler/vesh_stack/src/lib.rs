//! Stack safety for deep recursion.
//!
//! Both the parser and the evaluator recurse on the shape of the code:
//! nested lambdas, output captures and closure calls each add frames. A
//! script that recurses through a user function (`fn f []{ f }`-style
//! programs, or simply deeply nested data) must not take the process down
//! with a native stack overflow.
//!
//! - **Red zone**: 128KB. If less than this remains, the stack is grown.
//! - **Growth size**: 2MB per segment. Evaluator frames are fat (each
//!   closure call carries ports and scope handles), so segments are larger
//!   than a parser alone would need.

const RED_ZONE: usize = 128 * 1024;

const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

/// Run `f`, growing the stack first if the remaining space is below the red
/// zone.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting_depth_count() {
        // Mirrors how the parser counts lambda nesting.
        fn depth(code: &[u8]) -> usize {
            ensure_sufficient_stack(|| match code.split_first() {
                Some((b'{', rest)) => 1 + depth(rest),
                _ => 0,
            })
        }

        assert_eq!(depth(b"{{{x"), 3);
    }

    #[test]
    fn test_deep_recursion() {
        fn deep_recurse(n: u64) -> u64 {
            ensure_sufficient_stack(|| if n == 0 { 0 } else { deep_recurse(n - 1) + 1 })
        }

        assert_eq!(deep_recurse(100_000), 100_000);
    }

    #[test]
    fn test_result_passes_through() {
        let result: Result<i32, &str> = ensure_sufficient_stack(|| Err("boom"));
        assert_eq!(result, Err("boom"));
    }
}
