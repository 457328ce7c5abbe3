//! Human-facing ordering of page names.
//!
//! Names are compared with the Unicode Collation Algorithm under Korean
//! tailoring, so accented Latin sorts next to its base letter and lowercase
//! precedes uppercase at the last level. Names the collator considers equal
//! fall back to code point order to keep the ordering total.

use icu_collator::options::CollatorOptions;
use icu_collator::{Collator, CollatorBorrowed};
use icu_locale_core::locale;
use std::cmp::Ordering;
use std::sync::LazyLock;

static COLLATOR: LazyLock<Option<CollatorBorrowed<'static>>> =
    LazyLock::new(|| Collator::try_new(locale!("ko").into(), CollatorOptions::default()).ok());

/// Compare two page names for display.
pub fn compare(a: &str, b: &str) -> Ordering {
    let collated = match COLLATOR.as_ref() {
        Some(collator) => collator.compare(a, b),
        None => {
            let folded_a = a.chars().flat_map(char::to_lowercase);
            let folded_b = b.chars().flat_map(char::to_lowercase);
            folded_a.cmp(folded_b)
        }
    };
    collated.then_with(|| a.cmp(b))
}

/// Sort names in place by [`compare`].
pub fn sort_names<S: AsRef<str>>(names: &mut [S]) {
    names.sort_by(|a, b| compare(a.as_ref(), b.as_ref()));
}
