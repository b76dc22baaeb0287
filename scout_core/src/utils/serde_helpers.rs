// scout_core/src/utils/serde_helpers.rs

//! `#[serde(with = ...)]` adapters for nalgebra types, so persisted files stay
//! plain `[x, y]` arrays instead of nalgebra's internal layout.

pub mod point2_as_array {
    use nalgebra::Point2;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(point: &Point2<f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let arr = [point.x, point.y];
        serializer.collect_seq(arr.iter())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Point2<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let arr: [f64; 2] = Deserialize::deserialize(deserializer)?;
        Ok(Point2::new(arr[0], arr[1]))
    }
}
