//! Value parsers for comma separated coordinates on the command line.

use foundation::{LngLat, LngLatBounds};

fn parse_numbers<const N: usize>(s: &str, shape: &str) -> Result<[f64; N], String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != N {
        return Err(format!("expected {shape}, got {s:?}"));
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part
            .trim()
            .parse()
            .map_err(|_| format!("{:?} is not a number", part.trim()))?;
    }
    Ok(out)
}

/// `west,south,east,north`. East may be smaller than west for a box that
/// crosses the antimeridian.
pub fn parse_bbox(s: &str) -> Result<LngLatBounds, String> {
    let [west, south, east, north] = parse_numbers::<4>(s, "west,south,east,north")?;
    if south > north {
        return Err(format!("south ({south}) is above north ({north})"));
    }
    Ok(LngLatBounds::new(west, south, east, north))
}

pub fn parse_lnglat(s: &str) -> Result<LngLat, String> {
    let [lng, lat] = parse_numbers::<2>(s, "lng,lat")?;
    let p = LngLat::new(lng, lat);
    if !p.is_valid() {
        return Err(format!("({lng}, {lat}) is not a valid coordinate"));
    }
    Ok(p)
}

/// `WIDTHxHEIGHT` in pixels, e.g. `1280x720`.
pub fn parse_viewport(s: &str) -> Result<[f64; 2], String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let parse = |v: &str| -> Result<f64, String> {
        let px: u32 = v
            .trim()
            .parse()
            .map_err(|_| format!("{:?} is not a pixel size", v.trim()))?;
        if px == 0 {
            return Err("viewport sides must be positive".to_string());
        }
        Ok(f64::from(px))
    };
    Ok([parse(w)?, parse(h)?])
}
