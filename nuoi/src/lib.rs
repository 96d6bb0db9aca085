// Copyright (c) 2024 Botho Foundation

pub mod commands;
pub mod config;
