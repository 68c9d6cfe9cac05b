//! Watched / favorite / crap markers.
//!
//! | flag       | set                               | unflag                        |
//! |------------|-----------------------------------|-------------------------------|
//! | `watch`    | watched                           | clears watched/favorite/crap  |
//! | `favorite` | favorite + watched, clears crap   | clears favorite               |
//! | `crap`     | crap + watched, clears favorite   | clears crap                   |

use kolekto_index::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Watch,
    Favorite,
    Crap,
}

impl Flag {
    /// Attributes set to `true` when flagging.
    fn sets(self) -> &'static [&'static str] {
        match self {
            Flag::Watch => &["watched"],
            Flag::Favorite => &["favorite", "watched"],
            Flag::Crap => &["crap", "watched"],
        }
    }

    /// Attributes removed when flagging.
    fn clears(self) -> &'static [&'static str] {
        match self {
            Flag::Watch => &[],
            Flag::Favorite => &["crap"],
            Flag::Crap => &["favorite"],
        }
    }

    /// Attributes removed when unflagging.
    fn unflag_clears(self) -> &'static [&'static str] {
        match self {
            Flag::Watch => &["watched", "favorite", "crap"],
            Flag::Favorite => &["favorite"],
            Flag::Crap => &["crap"],
        }
    }

    pub fn apply(self, record: &mut Record, unflag: bool) {
        if unflag {
            for key in self.unflag_clears() {
                record.remove(key);
            }
        } else {
            for key in self.sets() {
                record.insert(*key, true);
            }
            for key in self.clears() {
                record.remove(key);
            }
        }
    }
}
