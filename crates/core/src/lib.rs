pub mod codec {
    pub mod domain {
        pub mod image_reader;
        pub mod image_writer;
    }
    pub mod infrastructure;
}

pub mod correction {
    pub mod domain {
        pub mod background_analyzer;
        pub mod bounding_cropper;
        pub mod glare_suppressor;
        pub mod orientation_normalizer;
        pub mod tone_corrector;
    }
}

pub mod detection {
    pub mod domain {
        pub mod detection;
        pub mod detection_cache;
        pub mod detection_payload;
        pub mod heuristic_face_scanner;
        pub mod region_detector;
        pub mod region_locator;
    }
    pub mod infrastructure;
}

pub mod framing {
    pub mod domain {
        pub mod aspect_ratio_framer;
    }
}

pub mod pipeline {
    pub mod batch_executor;
    pub mod enhance_batch_use_case;
    pub mod enhance_image_use_case;
    pub mod pipeline_error;
    pub mod pipeline_logger;
    pub mod infrastructure {
        pub mod threaded_batch_executor;
    }
}

pub mod shared {
    pub mod constants;
    pub mod enhancement_config;
    pub mod enhancement_result;
    pub mod luminance;
    pub mod raw_image;
    pub mod region_box;
}
