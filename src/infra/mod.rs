pub mod cumtd;
