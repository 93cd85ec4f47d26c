//! Epoch:version-release handling.
//!
//! EVR strings are compared segment-wise in the rpm manner: alternating runs
//! of digits and letters, with `~` sorting before anything else (including
//! the empty string). A missing epoch counts as `0`; a missing release
//! matches any release.

use std::cmp::Ordering;

/// The components of an `epoch:version-release` string. All three borrow
/// from the original string; absent parts are empty.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Evr<'a> {
    pub epoch: &'a str,
    pub version: &'a str,
    pub release: &'a str,
}

/// Splits an EVR string into its components.
///
/// The epoch is the leading run of digits followed by `:`; the release is
/// everything after the last `-`.
pub fn split(evr: &str) -> Evr<'_> {
    let (epoch, rest) = match evr.find(':') {
        Some(pos) if evr[..pos].bytes().all(|b| b.is_ascii_digit()) => {
            (&evr[..pos], &evr[pos + 1..])
        }
        _ => ("", evr),
    };

    let (version, release) = match rest.rfind('-') {
        Some(pos) => (&rest[..pos], &rest[pos + 1..]),
        None => (rest, ""),
    };

    Evr {
        epoch,
        version,
        release,
    }
}

/// Compares two version fragments rpm-style.
pub fn vercmp(a: &str, b: &str) -> Ordering {
    let mut a = a.as_bytes();
    let mut b = b.as_bytes();

    loop {
        // Tilde sorts before everything, even the end of the string
        let a_tilde = a.first() == Some(&b'~');
        let b_tilde = b.first() == Some(&b'~');
        if a_tilde || b_tilde {
            if a_tilde && b_tilde {
                a = &a[1..];
                b = &b[1..];
                continue;
            }
            return if a_tilde {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }

        // Skip separators (everything that is neither digit nor letter)
        while let Some(&c) = a.first() {
            if c.is_ascii_alphanumeric() {
                break;
            }
            a = &a[1..];
        }
        while let Some(&c) = b.first() {
            if c.is_ascii_alphanumeric() {
                break;
            }
            b = &b[1..];
        }

        match (a.first(), b.first()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(&ca), Some(&cb)) => {
                let numeric = ca.is_ascii_digit();
                if numeric != cb.is_ascii_digit() {
                    // A numeric segment always beats an alphabetic one
                    return if numeric {
                        Ordering::Greater
                    } else {
                        Ordering::Less
                    };
                }

                let take = |s: &[u8]| {
                    s.iter()
                        .take_while(|c| {
                            if numeric {
                                c.is_ascii_digit()
                            } else {
                                c.is_ascii_alphabetic()
                            }
                        })
                        .count()
                };
                let (sa, sb) = (take(a), take(b));
                let (seg_a, seg_b) = (&a[..sa], &b[..sb]);
                a = &a[sa..];
                b = &b[sb..];

                let ord = if numeric {
                    let trim = |s: &'_ [u8]| {
                        let nz = s.iter().take_while(|&&c| c == b'0').count();
                        s[nz..].to_vec()
                    };
                    let (na, nb) = (trim(seg_a), trim(seg_b));
                    na.len().cmp(&nb.len()).then_with(|| na.cmp(&nb))
                } else {
                    seg_a.cmp(seg_b)
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Compares two full EVR strings. When `match_release` is false (or either
/// side has no release), the release parts are ignored.
pub fn evrcmp(a: &str, b: &str, match_release: bool) -> Ordering {
    let ea = split(a);
    let eb = split(b);

    fn epoch(e: &str) -> &str {
        if e.is_empty() {
            "0"
        } else {
            e
        }
    }
    vercmp(epoch(ea.epoch), epoch(eb.epoch))
        .then_with(|| vercmp(ea.version, eb.version))
        .then_with(|| {
            if match_release && !ea.release.is_empty() && !eb.release.is_empty() {
                vercmp(ea.release, eb.release)
            } else {
                Ordering::Equal
            }
        })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split() {
        let evr = split("3:1.2-4.5");
        assert_eq!(evr.epoch, "3");
        assert_eq!(evr.version, "1.2");
        assert_eq!(evr.release, "4.5");

        let evr = split("1.2");
        assert_eq!(evr.epoch, "");
        assert_eq!(evr.version, "1.2");
        assert_eq!(evr.release, "");

        // A colon not preceded by digits is part of the version
        let evr = split("a:1");
        assert_eq!(evr.epoch, "");
        assert_eq!(evr.version, "a:1");
    }

    #[test]
    fn test_vercmp_ordering() {
        let cases = [
            ("1.0", "1.0", Ordering::Equal),
            ("1.0", "2.0", Ordering::Less),
            ("2.0.1", "2.0", Ordering::Greater),
            ("1.10", "1.9", Ordering::Greater),
            ("1.01", "1.1", Ordering::Equal),
            ("1.0a", "1.0", Ordering::Greater),
            ("1.0", "1.0rc1", Ordering::Greater),
            ("a", "1", Ordering::Less),
            ("1.0~rc1", "1.0", Ordering::Less),
            ("1.0~rc1", "1.0~rc2", Ordering::Less),
            ("1.0~~", "1.0~", Ordering::Less),
        ];
        for (a, b, expected) in cases {
            assert_eq!(vercmp(a, b), expected, "vercmp({a:?}, {b:?})");
            assert_eq!(vercmp(b, a), expected.reverse(), "vercmp({b:?}, {a:?})");
        }
    }

    #[test]
    fn test_evrcmp_epoch_and_release() {
        assert_eq!(evrcmp("1:1.0-1", "2.0-1", true), Ordering::Greater);
        assert_eq!(evrcmp("1.0-1", "1.0-2", true), Ordering::Less);
        assert_eq!(evrcmp("1.0-1", "1.0", true), Ordering::Equal);
        assert_eq!(evrcmp("1.0-1", "1.0-2", false), Ordering::Equal);
        assert_eq!(evrcmp("0:1.0", "1.0", true), Ordering::Equal);
    }

    proptest::proptest! {
        #[test]
        fn vercmp_is_antisymmetric(a in "[0-9a-z.~]{0,10}", b in "[0-9a-z.~]{0,10}") {
            proptest::prop_assert_eq!(vercmp(&a, &b), vercmp(&b, &a).reverse());
        }

        #[test]
        fn vercmp_is_reflexive(a in "[0-9a-z.~]{0,10}") {
            proptest::prop_assert_eq!(vercmp(&a, &a), Ordering::Equal);
        }

        #[test]
        fn split_partitions_the_input(
            epoch in "[0-9]{0,3}",
            version in "[0-9a-z.]{1,6}",
            release in "[0-9a-z.]{0,4}",
        ) {
            let mut text = String::new();
            if !epoch.is_empty() {
                text.push_str(&epoch);
                text.push(':');
            }
            text.push_str(&version);
            if !release.is_empty() {
                text.push('-');
                text.push_str(&release);
            }
            let evr = split(&text);
            proptest::prop_assert_eq!(evr.epoch, epoch.as_str());
            proptest::prop_assert_eq!(evr.release, release.as_str());
        }
    }
}
