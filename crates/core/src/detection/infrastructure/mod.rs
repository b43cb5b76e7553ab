pub mod http_region_detector;
