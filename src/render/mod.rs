pub mod bars;
pub mod frame;
pub mod raster;
pub mod style;
pub mod timing;
