use std::ffi::{c_void, CStr};

use log::{log, Level};

use ash::{extensions::ext::DebugUtils, vk, Entry, Instance};

/// Forwards validation layer output into the crate's logger.
pub(super) struct DebugMessenger {
    debug_utils: DebugUtils,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    pub(super) fn new(
        entry: &Entry,
        instance: &Instance,
        create_info: vk::DebugUtilsMessengerCreateInfoEXTBuilder,
    ) -> Result<DebugMessenger, vk::Result> {
        let debug_utils = DebugUtils::new(entry, instance);
        let messenger =
            unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }?;
        Ok(DebugMessenger {
            debug_utils,
            messenger,
        })
    }

    pub(super) fn create_info() -> vk::DebugUtilsMessengerCreateInfoEXTBuilder<'static> {
        vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(Self::messenger_callback))
    }

    pub(super) unsafe fn destroy(&mut self) {
        self.debug_utils
            .destroy_debug_utils_messenger(self.messenger, None);
    }

    unsafe extern "system" fn messenger_callback(
        message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT,
        p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
        _p_user_data: *mut c_void,
    ) -> vk::Bool32 {
        let message = CStr::from_ptr((*p_callback_data).p_message);
        let ty = format!("{:?}", message_type).to_lowercase();
        log!(
            match message_severity {
                vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE => Level::Trace,
                vk::DebugUtilsMessageSeverityFlagsEXT::INFO => Level::Debug,
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => Level::Warn,
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => Level::Error,
                _ => Level::Info,
            },
            "VK:{} {:?}",
            ty,
            message
        );
        vk::FALSE
    }
}
