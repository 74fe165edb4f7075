//! Vertical margin collapsing.
//!
//! [§ 8.3.1 Collapsing margins](https://www.w3.org/TR/CSS2/box.html#collapsing-margins)
//!
//! "In CSS, the adjoining margins of two or more boxes (which might or might
//! not be siblings) can combine to form a single margin. Margins that
//! combine this way are said to collapse, and the resulting combined margin
//! is called a collapsed margin."

/// A run of adjoining margins, kept as its largest positive part and its
/// largest negative magnitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollapsibleMargin {
    /// Largest positive margin, `>= 0`.
    pub positive: i32,
    /// Largest negative margin as a magnitude, `>= 0`.
    pub negative: i32,
}

impl CollapsibleMargin {
    /// A run holding one margin.
    #[must_use]
    pub const fn new(margin: i32) -> Self {
        if margin >= 0 {
            Self {
                positive: margin,
                negative: 0,
            }
        } else {
            Self {
                positive: 0,
                negative: -margin,
            }
        }
    }

    /// Add a margin to the run.
    #[must_use]
    pub fn adjoin(self, margin: i32) -> Self {
        let other = Self::new(margin);
        Self {
            positive: self.positive.max(other.positive),
            negative: self.negative.max(other.negative),
        }
    }

    /// "When two or more margins collapse, the resulting margin width is the
    /// maximum of the collapsing margins' widths. In the case of negative
    /// margins, the maximum of the absolute values of the negative adjoining
    /// margins is deducted from the maximum of the positive adjoining
    /// margins. If there are no positive margins, the maximum of the
    /// absolute values of the adjoining margins is deducted from zero."
    #[must_use]
    pub const fn resolve(self) -> i32 {
        self.positive - self.negative
    }
}

/// Collapse two adjoining margins: the larger of two non-negative margins,
/// the more negative of two negative ones, the sum otherwise.
#[must_use]
pub fn collapse_two_margins(a: i32, b: i32) -> i32 {
    CollapsibleMargin::new(a).adjoin(b).resolve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_equal_positive_margins() {
        assert_eq!(collapse_two_margins(40, 40), 40);
    }

    #[test]
    fn test_mixed_and_negative() {
        assert_eq!(collapse_two_margins(30, -10), 20);
        assert_eq!(collapse_two_margins(-10, -25), -25);
        assert_eq!(CollapsibleMargin::new(10).adjoin(-4).adjoin(25).adjoin(-8).resolve(), 17);
    }

    // Bound inputs so sums cannot overflow.
    fn small(v: i16) -> i32 {
        i32::from(v)
    }

    #[quickcheck]
    fn prop_collapse_is_symmetric(a: i16, b: i16) -> bool {
        collapse_two_margins(small(a), small(b)) == collapse_two_margins(small(b), small(a))
    }

    #[quickcheck]
    fn prop_collapse_cases(a: i16, b: i16) -> bool {
        let (a, b) = (small(a), small(b));
        let got = collapse_two_margins(a, b);
        if a >= 0 && b >= 0 {
            got == a.max(b)
        } else if a < 0 && b < 0 {
            got == a.min(b)
        } else {
            got == a + b
        }
    }

    #[quickcheck]
    fn prop_adjoin_order_does_not_matter(margins: Vec<i16>) -> bool {
        let forward = margins
            .iter()
            .fold(CollapsibleMargin::default(), |m, v| m.adjoin(small(*v)));
        let backward = margins
            .iter()
            .rev()
            .fold(CollapsibleMargin::default(), |m, v| m.adjoin(small(*v)));
        forward == backward
    }
}
