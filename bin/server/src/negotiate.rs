//! `Accept` header negotiation.

/// Picks the offered media type the client prefers.
///
/// A missing or blank header accepts anything, so the first offer wins.
/// Each offer is weighed by the most specific matching media range
/// (`type/subtype` over `type/*` over `*/*`); ties go to the earlier offer.
/// Returns `None` when no offer is acceptable.
pub fn preferred<'a>(accept: Option<&str>, offers: &[&'a str]) -> Option<&'a str> {
    let ranges: Vec<MediaRange<'_>> = match accept.map(str::trim) {
        Some(header) if !header.is_empty() => {
            header.split(',').filter_map(MediaRange::parse).collect()
        }
        _ => return offers.first().copied(),
    };

    let mut best: Option<(&'a str, f32)> = None;
    for &offer in offers {
        let Some(quality) = quality_of(&ranges, offer) else {
            continue;
        };
        if quality <= 0.0 {
            continue;
        }
        if best.is_none_or(|(_, best_quality)| quality > best_quality) {
            best = Some((offer, quality));
        }
    }

    best.map(|(offer, _)| offer)
}

fn quality_of(ranges: &[MediaRange<'_>], offer: &str) -> Option<f32> {
    let (kind, subtype) = offer.split_once('/')?;

    ranges
        .iter()
        .filter_map(|range| range.specificity(kind, subtype).map(|s| (s, range.quality)))
        .max_by_key(|(specificity, _)| *specificity)
        .map(|(_, quality)| quality)
}

struct MediaRange<'a> {
    kind: &'a str,
    subtype: &'a str,
    quality: f32,
}

impl<'a> MediaRange<'a> {
    fn parse(raw: &'a str) -> Option<Self> {
        let mut parts = raw.split(';').map(str::trim);
        let (kind, subtype) = parts.next()?.split_once('/')?;
        if kind.is_empty() || subtype.is_empty() {
            return None;
        }

        let mut quality = 1.0;
        for param in parts {
            match param.split_once('=') {
                Some((name, value)) if name.trim().eq_ignore_ascii_case("q") => {
                    quality = value.trim().parse::<f32>().ok()?.clamp(0.0, 1.0);
                }
                _ => {}
            }
        }

        Some(Self {
            kind,
            subtype,
            quality,
        })
    }

    /// How closely this range matches `kind/subtype`, if at all.
    fn specificity(&self, kind: &str, subtype: &str) -> Option<u8> {
        match (self.kind, self.subtype) {
            ("*", "*") => Some(0),
            (k, "*") if k.eq_ignore_ascii_case(kind) => Some(1),
            (k, s) if k.eq_ignore_ascii_case(kind) && s.eq_ignore_ascii_case(subtype) => Some(2),
            _ => None,
        }
    }
}
