//! Declaration macro for the fixed-level score types.

/// Declares a score struct with one `i64` field per level, plus its
/// constructor, accessors, `Score`/`ParseableScore` impls, level-wise
/// arithmetic, lexicographic ordering and `Display`/`Debug`.
///
/// Fields are compared in the order they are listed, so list them highest
/// priority first.
///
/// # Usage
/// ```ignore
/// score_type! {
///     /// Docs for the type.
///     HardSoftScore { hard: Hard => "hard", soft: Soft => "soft" }
/// }
/// ```
macro_rules! score_type {
    (
        $(#[$meta:meta])*
        $name:ident { $($field:ident: $level:ident => $suffix:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name {
            $($field: i64),+
        }

        impl $name {
            /// The zero score.
            pub const ZERO: $name = $name { $($field: 0),+ };

            #[inline]
            pub const fn of($($field: i64),+) -> Self {
                $name { $($field),+ }
            }

            $(
                #[inline]
                pub const fn $field(&self) -> i64 {
                    self.$field
                }
            )+
        }

        impl $crate::score::Score for $name {
            const LEVELS: &'static [$crate::score::ScoreLevel] =
                &[$($crate::score::ScoreLevel::$level),+];
            const SUFFIXES: &'static [&'static str] = &[$($suffix),+];

            fn to_level_numbers(&self) -> Vec<i64> {
                vec![$(self.$field),+]
            }

            fn from_level_numbers(levels: &[i64]) -> Option<Self> {
                match levels {
                    [$($field),+] => Some($name::of($(*$field),+)),
                    _ => None,
                }
            }

            fn checked_scale(&self, factor: i64) -> Option<Self> {
                Some($name::of($(self.$field.checked_mul(factor)?),+))
            }

            fn checked_add(&self, other: &Self) -> Option<Self> {
                Some($name::of($(self.$field.checked_add(other.$field)?),+))
            }

            fn checked_sub(&self, other: &Self) -> Option<Self> {
                Some($name::of($(self.$field.checked_sub(other.$field)?),+))
            }

            fn abs(&self) -> Self {
                $name::of($(self.$field.abs()),+)
            }
        }

        impl $crate::score::ParseableScore for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                std::cmp::Ordering::Equal
                    $(.then_with(|| self.$field.cmp(&other.$field)))+
            }
        }

        impl std::ops::Add for $name {
            type Output = Self;

            fn add(self, other: Self) -> Self {
                $name::of($(self.$field + other.$field),+)
            }
        }

        impl std::ops::Sub for $name {
            type Output = Self;

            fn sub(self, other: Self) -> Self {
                $name::of($(self.$field - other.$field),+)
            }
        }

        impl std::ops::Neg for $name {
            type Output = Self;

            fn neg(self) -> Self {
                $name::of($(-self.$field),+)
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold($name::ZERO, |total, score| total + score)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                $crate::score::traits::write_levels(self, f)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut tuple = f.debug_tuple(stringify!($name));
                $(tuple.field(&self.$field);)+
                tuple.finish()
            }
        }
    };
}
