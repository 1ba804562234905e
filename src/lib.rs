pub mod orphdat_core;
