pub mod auth;
pub mod config;
pub mod database;
pub mod dtos;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod orders;
pub mod resource;
pub mod routes;
pub mod state;
pub mod views;
