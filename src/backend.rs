pub mod config;
pub mod dispatch;
pub mod observer;
pub mod pages;
pub mod rest;
pub mod transport;
