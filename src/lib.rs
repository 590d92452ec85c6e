//! Driving Simulation Library
//!
//! A scrolling-road traffic simulation that runs headless: traffic engine,
//! player kinematics and proximity/collision feedback.

pub mod simulation;
