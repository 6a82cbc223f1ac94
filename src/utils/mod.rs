pub mod availability;
pub mod db_utils;
