//! Category expression grammar (Design Notes open question): blueprints and
//! scripted queries describe unit sets with category expressions — a
//! simple name, the `ALLUNITS` wildcard, or a `union`/`intersection`/
//! `difference` of two sub-expressions. The scripting VM builds these as
//! tables; this core models the same shape as a tagged sum so matching
//! doesn't need to re-enter the VM for every candidate unit.
//!
//! Ground: `category_utils.hpp`/`category_utils.cpp`'s `match_impl`
//! recursive descent, including its depth-16 guard against pathological
//! nesting (malformed or cyclic category trees from a hand-edited asset).

use std::collections::HashSet;

const MAX_DEPTH: u32 = 16;

/// A parsed category expression, matched against a unit's `categories` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryExpr {
    /// A simple category name, e.g. `"LAND"`. `"ALLUNITS"` matches anything.
    Name(String),
    Union(Box<CategoryExpr>, Box<CategoryExpr>),
    Intersection(Box<CategoryExpr>, Box<CategoryExpr>),
    Difference(Box<CategoryExpr>, Box<CategoryExpr>),
}

impl CategoryExpr {
    pub fn name(cat: impl Into<String>) -> Self {
        CategoryExpr::Name(cat.into())
    }

    pub fn union(left: CategoryExpr, right: CategoryExpr) -> Self {
        CategoryExpr::Union(Box::new(left), Box::new(right))
    }

    pub fn intersection(left: CategoryExpr, right: CategoryExpr) -> Self {
        CategoryExpr::Intersection(Box::new(left), Box::new(right))
    }

    pub fn difference(left: CategoryExpr, right: CategoryExpr) -> Self {
        CategoryExpr::Difference(Box::new(left), Box::new(right))
    }

    /// Evaluate this expression against a unit's category set.
    ///
    /// Mirrors `match_impl`'s recursion-depth guard: an expression tree
    /// nested past [`MAX_DEPTH`] evaluates to `false` rather than
    /// overflowing the stack or looping on a cyclic hand-built tree.
    pub fn matches(&self, cats: &HashSet<String>) -> bool {
        self.matches_at_depth(cats, 0)
    }

    fn matches_at_depth(&self, cats: &HashSet<String>, depth: u32) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }
        match self {
            CategoryExpr::Name(name) => name == "ALLUNITS" || cats.contains(name.as_str()),
            CategoryExpr::Union(l, r) => {
                l.matches_at_depth(cats, depth + 1) || r.matches_at_depth(cats, depth + 1)
            }
            CategoryExpr::Intersection(l, r) => {
                l.matches_at_depth(cats, depth + 1) && r.matches_at_depth(cats, depth + 1)
            }
            CategoryExpr::Difference(l, r) => {
                l.matches_at_depth(cats, depth + 1) && !r.matches_at_depth(cats, depth + 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cats(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn simple_name_matches_membership() {
        let expr = CategoryExpr::name("LAND");
        assert!(expr.matches(&cats(&["LAND", "MOBILE"])));
        assert!(!expr.matches(&cats(&["AIR"])));
    }

    #[test]
    fn allunits_wildcard_always_matches() {
        let expr = CategoryExpr::name("ALLUNITS");
        assert!(expr.matches(&cats(&[])));
        assert!(expr.matches(&cats(&["STRUCTURE"])));
    }

    #[test]
    fn union_matches_either_side() {
        let expr = CategoryExpr::union(CategoryExpr::name("LAND"), CategoryExpr::name("AIR"));
        assert!(expr.matches(&cats(&["AIR"])));
        assert!(expr.matches(&cats(&["LAND"])));
        assert!(!expr.matches(&cats(&["WATER"])));
    }

    #[test]
    fn intersection_requires_both_sides() {
        let expr = CategoryExpr::intersection(
            CategoryExpr::name("MOBILE"),
            CategoryExpr::name("LAND"),
        );
        assert!(expr.matches(&cats(&["MOBILE", "LAND"])));
        assert!(!expr.matches(&cats(&["MOBILE"])));
        assert!(!expr.matches(&cats(&["LAND"])));
    }

    #[test]
    fn difference_excludes_right_side() {
        let expr = CategoryExpr::difference(
            CategoryExpr::name("MOBILE"),
            CategoryExpr::name("AIR"),
        );
        assert!(expr.matches(&cats(&["MOBILE", "LAND"])));
        assert!(!expr.matches(&cats(&["MOBILE", "AIR"])));
    }

    #[test]
    fn nested_compound_expression() {
        // (STRUCTURE union MOBILE) intersection (LAND difference AMPHIBIOUS)
        let expr = CategoryExpr::intersection(
            CategoryExpr::union(CategoryExpr::name("STRUCTURE"), CategoryExpr::name("MOBILE")),
            CategoryExpr::difference(CategoryExpr::name("LAND"), CategoryExpr::name("AMPHIBIOUS")),
        );
        assert!(expr.matches(&cats(&["MOBILE", "LAND"])));
        assert!(!expr.matches(&cats(&["MOBILE", "LAND", "AMPHIBIOUS"])));
        assert!(!expr.matches(&cats(&["AIR", "LAND"])));
    }

    #[test]
    fn depth_guard_rejects_pathological_nesting() {
        // Build a union chain 20 deep; matching must bottom out to `false`
        // rather than recurse unbounded, same as the original's depth-16 guard.
        let mut expr = CategoryExpr::name("LAND");
        for _ in 0..20 {
            expr = CategoryExpr::union(expr, CategoryExpr::name("NEVER_MATCHES"));
        }
        // The target name is still reachable within depth at the outer
        // levels, so this should still resolve true from the cheap side;
        // verify instead that an expression deliberately deeper than
        // MAX_DEPTH on every branch is rejected.
        let mut only_right_recurses = CategoryExpr::name("UNREACHABLE");
        for _ in 0..20 {
            only_right_recurses =
                CategoryExpr::intersection(CategoryExpr::name("ALLUNITS"), only_right_recurses);
        }
        assert!(!only_right_recurses.matches(&cats(&["LAND"])));
        let _ = expr;
    }
}
