//! Build order of library containers.
//!
//! Library names follow a `<base><layer>` convention (`exf1`, `fin3`), where
//! the optional layer digit is 1, 2 or 3. Each base may appear in one of ten
//! priority lists; higher list numbers build first and unlisted bases build
//! before all listed ones.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

/// Priority assigned to bases that appear in no list.
pub const UNLISTED_PRIORITY: u8 = 11;

/// Library suffix ignored when computing sort keys.
pub const LIBRARY_EXTENSION: &str = ".pbl";

/// The ten standard priority lists, list 1 first.
pub const STANDARD_PRIORITY_LISTS: [&[&str]; 10] = [
    &["lif"],
    &["jif"],
    &["arf", "cfg", "inf", "kal", "nfy", "pbdom", "sti", "stm", "tse"],
    &["dss", "eft", "exf", "fsu", "grp", "liq", "net", "osu", "str", "szn"],
    &["sfi"],
    &["bai", "kim"],
    &[
        "cfg_lohn", "elm", "elmg", "elmp", "elx", "loh", "lor", "spe", "stm_lohn",
    ],
    &[
        "anl", "deb", "fib", "fin", "fre", "kor", "kre", "mai", "mve", "tbs", "zea", "zei", "zek",
        "zes",
    ],
    &[
        "adr", "arc", "art", "bde", "biz", "dgm", "dis", "drucken", "dzb", "ecp", "ein", "ger",
        "kon", "lag", "lda", "map", "mit", "obj", "ord", "pos", "prj", "rap", "res", "sal",
    ],
    &[
        "avd", "bbp", "bst", "con", "das", "dbe", "dka", "dma", "dmi", "dta", "dto", "dwh", "dws",
        "egm", "kas", "kat", "kng", "mie", "pro", "reg", "sdi", "ser", "sfm", "wae", "wgb", "wss",
    ],
];

/// Split a library name into its base and layer digit (`"xyz3"` -> `("xyz", 3)`).
///
/// Only a trailing 1, 2 or 3 is a layer; anything else yields layer 0.
pub fn parse_name(name: &str) -> (&str, u8) {
    match name.as_bytes().last().copied() {
        Some(b @ b'1'..=b'3') => (&name[..name.len() - 1], b - b'0'),
        _ => (name, 0),
    }
}

/// Sorts library names into build order.
#[derive(Clone, Debug)]
pub struct LibraryOrder {
    priorities: HashMap<String, u8>,
}

impl LibraryOrder {
    /// Build from priority lists; the list at index `i` gets priority `i + 1`.
    /// A base listed twice keeps the later list's priority.
    pub fn new<L, S>(lists: L) -> Self
    where
        L: IntoIterator,
        L::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut priorities = HashMap::new();
        for (i, list) in lists.into_iter().enumerate() {
            let priority = (i + 1) as u8;
            for base in list {
                priorities.insert(base.into(), priority);
            }
        }
        Self { priorities }
    }

    /// Priority of a base name: 1-10 when listed, [`UNLISTED_PRIORITY`] otherwise.
    pub fn priority(&self, base: &str) -> u8 {
        self.priorities
            .get(base)
            .copied()
            .unwrap_or(UNLISTED_PRIORITY)
    }

    /// Compare two library names by build order.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        let (base_a, layer_a) = parse_name(a.strip_suffix(LIBRARY_EXTENSION).unwrap_or(a));
        let (base_b, layer_b) = parse_name(b.strip_suffix(LIBRARY_EXTENSION).unwrap_or(b));

        self.priority(base_b)
            .cmp(&self.priority(base_a))
            .then_with(|| base_a.cmp(base_b))
            .then_with(|| layer_b.cmp(&layer_a))
    }

    /// Sort names in place into build order.
    pub fn sort<S: AsRef<str>>(&self, names: &mut [S]) {
        names.sort_by(|a, b| self.compare(a.as_ref(), b.as_ref()));
        debug!(libraries = names.len(), "sorted library build order");
    }

    /// Return the names in build order.
    pub fn sorted(&self, mut names: Vec<String>) -> Vec<String> {
        self.sort(&mut names);
        names
    }
}

impl Default for LibraryOrder {
    fn default() -> Self {
        Self::new(STANDARD_PRIORITY_LISTS.iter().map(|list| list.iter().copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fixture_order() -> LibraryOrder {
        let lists: [&[&str]; 10] = [
            &["zebra", "apple"],
            &["dog"],
            &[],
            &["house"],
            &["gamma", "beta"],
            &["jupiter"],
            &["phone"],
            &["water"],
            &["carrot", "banana"],
            &["star", "moon"],
        ];
        LibraryOrder::new(lists.iter().map(|l| l.iter().copied()))
    }

    fn sorted(order: &LibraryOrder, input: &[&str]) -> Vec<String> {
        order.sorted(input.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn parse_name_layers() {
        assert_eq!(parse_name("xyz3"), ("xyz", 3));
        assert_eq!(parse_name("abc2"), ("abc", 2));
        assert_eq!(parse_name("ghf1"), ("ghf", 1));
        assert_eq!(parse_name("nosuffix"), ("nosuffix", 0));
        assert_eq!(parse_name("itemwith1"), ("itemwith", 1));
        assert_eq!(parse_name("item4"), ("item4", 0));
        assert_eq!(parse_name(""), ("", 0));
    }

    #[test]
    fn priority_lookup() {
        let order = LibraryOrder::new([vec!["apple", "zebra"], vec!["dog"], vec!["star", "moon"]]);
        assert_eq!(order.priority("apple"), 1);
        assert_eq!(order.priority("zebra"), 1);
        assert_eq!(order.priority("dog"), 2);
        assert_eq!(order.priority("star"), 3);
        assert_eq!(order.priority("unlisted"), UNLISTED_PRIORITY);
    }

    #[test]
    fn higher_list_sorts_first() {
        let order = fixture_order();
        assert_eq!(sorted(&order, &["apple1", "star1"]), ["star1", "apple1"]);
    }

    #[test]
    fn mixed_example() {
        let order = fixture_order();
        let input = [
            "apple1", "star3", "unlisted2", "banana", "zebra3", "moon2", "unlisted1", "gamma3",
            "star1", "beta1", "zebra1", "other_item", "moon1", "carrot2", "unlisted3", "beta2",
        ];
        let expected = [
            "other_item", "unlisted3", "unlisted2", "unlisted1", "moon2", "moon1", "star3",
            "star1", "banana", "carrot2", "beta2", "beta1", "gamma3", "apple1", "zebra3", "zebra1",
        ];
        assert_eq!(sorted(&order, &input), expected);
    }

    #[test]
    fn unlisted_first() {
        let order = fixture_order();
        let input = ["apple1", "unlisted2", "star3", "unlisted1", "zebra1", "unlisted3"];
        let expected = ["unlisted3", "unlisted2", "unlisted1", "star3", "apple1", "zebra1"];
        assert_eq!(sorted(&order, &input), expected);
    }

    #[test]
    fn alphabetical_within_list_then_layer_descending() {
        let order = fixture_order();
        assert_eq!(sorted(&order, &["zebra1", "apple1"]), ["apple1", "zebra1"]);
        assert_eq!(sorted(&order, &["zebra1", "zebra3", "zebra2"]), ["zebra3", "zebra2", "zebra1"]);
    }

    #[test]
    fn no_layers_and_edge_inputs() {
        let order = fixture_order();
        assert_eq!(
            sorted(&order, &["apple", "star", "unlisted", "zebra", "moon"]),
            ["unlisted", "moon", "star", "apple", "zebra"]
        );
        assert!(sorted(&order, &[]).is_empty());
        assert_eq!(sorted(&order, &["one_item"]), ["one_item"]);
        assert_eq!(
            sorted(&order, &["beta1", "beta3", "alpha", "star1", "star2", "apple3"]),
            ["alpha", "star2", "star1", "beta3", "beta1", "apple3"]
        );
    }

    #[test]
    fn standard_lists_on_real_libraries() {
        let input = [
            "arf1.pbl", "bai1.pbl", "cfg1.pbl", "inf1.pbl", "kal1.pbl", "nfy1.pbl", "pbdom.pbl",
            "sti1.pbl", "stm1.pbl", "tse1.pbl", "adr1.pbl", "arc1.pbl", "art1.pbl", "bde1.pbl",
            "biz1.pbl", "dgm1.pbl", "dis1.pbl", "drucken1.pbl", "dzb1.pbl", "ecp1.pbl", "ein1.pbl",
            "ger1.pbl", "kon1.pbl", "lag1.pbl", "lda1.pbl", "map1.pbl", "mit1.pbl", "obj1.pbl",
            "ord1.pbl", "pos1.pbl", "prj1.pbl", "rap1.pbl", "res1.pbl", "sal1.pbl", "anl1.pbl",
            "deb1.pbl", "fib1.pbl", "fin1.pbl", "fre1.pbl", "kor1.pbl", "kre1.pbl", "mai1.pbl",
            "mve1.pbl", "tbs1.pbl", "zea1.pbl", "zei1.pbl", "zek1.pbl", "zes1.pbl", "kim1.pbl",
            "eft1.pbl", "exf1.pbl", "fsu1.pbl", "grp1.pbl", "liq1.pbl", "net1.pbl", "osu1.pbl",
            "str1.pbl", "szn1.pbl", "jif1.pbl", "lif1.pbl",
        ];
        let expected = [
            // list 9
            "adr1.pbl", "arc1.pbl", "art1.pbl", "bde1.pbl", "biz1.pbl", "dgm1.pbl", "dis1.pbl",
            "drucken1.pbl", "dzb1.pbl", "ecp1.pbl", "ein1.pbl", "ger1.pbl", "kon1.pbl", "lag1.pbl",
            "lda1.pbl", "map1.pbl", "mit1.pbl", "obj1.pbl", "ord1.pbl", "pos1.pbl", "prj1.pbl",
            "rap1.pbl", "res1.pbl", "sal1.pbl",
            // list 8
            "anl1.pbl", "deb1.pbl", "fib1.pbl", "fin1.pbl", "fre1.pbl", "kor1.pbl", "kre1.pbl",
            "mai1.pbl", "mve1.pbl", "tbs1.pbl", "zea1.pbl", "zei1.pbl", "zek1.pbl", "zes1.pbl",
            // list 6
            "bai1.pbl", "kim1.pbl",
            // list 4
            "eft1.pbl", "exf1.pbl", "fsu1.pbl", "grp1.pbl", "liq1.pbl", "net1.pbl", "osu1.pbl",
            "str1.pbl", "szn1.pbl",
            // list 3
            "arf1.pbl", "cfg1.pbl", "inf1.pbl", "kal1.pbl", "nfy1.pbl", "pbdom.pbl", "sti1.pbl",
            "stm1.pbl", "tse1.pbl",
            // lists 2 and 1
            "jif1.pbl", "lif1.pbl",
        ];
        assert_eq!(sorted(&LibraryOrder::default(), &input), expected);
    }

    #[test]
    fn extension_ignored_for_keys() {
        let order = LibraryOrder::default();
        assert_eq!(order.compare("exf1.pbl", "exf1"), Ordering::Equal);
        assert_eq!(order.compare("exf3.pbl", "exf1.pbl"), Ordering::Less);
    }

    proptest! {
        #[test]
        fn sort_is_idempotent_permutation(
            names in prop::collection::vec("(lif|jif|exf|fin|adr|wss|zzz|abc)[0-4]?(\\.pbl)?", 0..30)
        ) {
            let order = LibraryOrder::default();
            let once = order.sorted(names.clone());
            prop_assert_eq!(&order.sorted(once.clone()), &once);

            let mut a = names;
            let mut b = once;
            a.sort();
            b.sort();
            prop_assert_eq!(a, b);
        }
    }
}
