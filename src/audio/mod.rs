pub mod capture;
pub mod decode;
pub mod rate;
pub mod spectrum;
pub mod window;
