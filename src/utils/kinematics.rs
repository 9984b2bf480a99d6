
use std::f64::consts;

pub const WGS84_SEMI_MAJOR_AXIS_METERS:f64 = 6378137.0;
pub const WGS84_SEMI_MINOR_AXIS_METERS:f64 = 6356752.314245;
pub const OMEGA_E:f64 = 7.2921151467e-5;     // [rad/s] WGS-84 value of the earth's rotation rate
pub const C:f64 = 2.99792458e8;              // [m/s] speed of light

#[derive(Debug)]
pub struct PositionWGS84 {
    pub latitude:f64,
    pub longitude:f64,
    pub height_above_ellipsoid:f64,
}

/// Closed-form ECEF to geodetic conversion (Bowring's method, single
/// iteration on the reduced latitude)
pub fn ecef_to_wgs84(e1:f64, e2:f64, e3:f64) -> PositionWGS84 {
    let a = WGS84_SEMI_MAJOR_AXIS_METERS;
    let b = WGS84_SEMI_MINOR_AXIS_METERS;

    let e_sq:f64  = (a*a - b*b) / (a*a);
    let ep_sq:f64 = (a*a - b*b) / (b*b);

    let p:f64 = (e1*e1 + e2*e2).sqrt();
    let r:f64 = (p*p   + e3*e3).sqrt();

    let beta:f64 = (((b*e3)/(a*p)) * (1.0 + ep_sq*(b/r))).atan();

    let latitude:f64 = {
        let num:f64   = e3 + (ep_sq * b * beta.sin().powi(3));
        let denom:f64 = p  - (e_sq  * a * beta.cos().powi(3));
        (num/denom).atan()
    };
    let longitude:f64 = e2.atan2(e1);

    let v = a / (1.0 - (e_sq*latitude.sin().powi(2))).sqrt();
    let height_above_ellipsoid = p*latitude.cos() + e3*latitude.sin() - (a*a / v);

    PositionWGS84{ latitude, longitude, height_above_ellipsoid }
}

pub fn rad_to_deg(rad:f64) -> f64 { rad * 180.0 / consts::PI }

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn equator_on_the_ellipsoid() {
        let pos = ecef_to_wgs84(WGS84_SEMI_MAJOR_AXIS_METERS, 0.0, 0.0);
        assert!(pos.latitude.abs() < 1e-9);
        assert!(pos.longitude.abs() < 1e-9);
        assert!(pos.height_above_ellipsoid.abs() < 1e-3);
    }

    #[test]
    fn altitude_above_the_equator() {
        let pos = ecef_to_wgs84(WGS84_SEMI_MAJOR_AXIS_METERS + 1000.0, 0.0, 0.0);
        assert!((pos.height_above_ellipsoid - 1000.0).abs() < 1e-3);
    }

    #[test]
    fn longitude_quadrants() {
        let pos = ecef_to_wgs84(0.0, WGS84_SEMI_MAJOR_AXIS_METERS, 0.0);
        assert!((rad_to_deg(pos.longitude) - 90.0).abs() < 1e-9);
    }

}
