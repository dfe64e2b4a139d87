//! Ordered fallback strategies
//!
//! A metric that can be recovered more than one way is described as a list
//! of [`Strategy`] values tried in order. The first success wins and its
//! name travels with the value so the result can be traced.

/// One way of pulling a `T` out of a log.
pub trait Strategy<T> {
    /// Stable name reported when this strategy wins.
    fn name(&self) -> &'static str;

    /// Try to extract a value; `None` means "did not match".
    fn apply(&self, text: &str) -> Option<T>;
}

/// A value and the strategy that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extracted<T> {
    /// Extracted value
    pub value: T,
    /// Name of the winning strategy
    pub strategy: &'static str,
}

/// Try `strategies` in order and return the first success.
pub fn first_success<T>(text: &str, strategies: &[&dyn Strategy<T>]) -> Option<Extracted<T>> {
    strategies.iter().find_map(|s| {
        s.apply(text).map(|value| Extracted {
            value,
            strategy: s.name(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, Option<u32>);

    impl Strategy<u32> for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn apply(&self, _text: &str) -> Option<u32> {
            self.1
        }
    }

    #[test]
    fn test_first_success_wins() {
        let a = Fixed("a", None);
        let b = Fixed("b", Some(2));
        let c = Fixed("c", Some(3));
        let got = first_success("", &[&a, &b, &c]).unwrap();
        assert_eq!(got, Extracted { value: 2, strategy: "b" });
    }

    #[test]
    fn test_all_fail() {
        let a = Fixed("a", None);
        assert!(first_success("", &[&a]).is_none());
        assert!(first_success::<u32>("", &[]).is_none());
    }
}
