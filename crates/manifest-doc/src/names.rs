//! Element and attribute names used by manifest documents.

/// Android resource namespace URI.
pub const ANDROID_NS: &str = "http://schemas.android.com/apk/res/android";

/// Conventional prefix bound to [`ANDROID_NS`].
pub const ANDROID_PREFIX: &str = "android";

/// Namespace URI of `xmlns` declarations.
pub const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";

/// Element tags.
pub mod tag {
    pub const MANIFEST: &str = "manifest";
    pub const APPLICATION: &str = "application";
    pub const ACTIVITY: &str = "activity";
    pub const SERVICE: &str = "service";
    pub const RECEIVER: &str = "receiver";
    pub const INTENT_FILTER: &str = "intent-filter";
    pub const USES_SDK: &str = "uses-sdk";
}

/// Attribute local names in the android namespace.
pub mod attr {
    pub const NAME: &str = "name";
    pub const EXPORTED: &str = "exported";
    pub const MIN_SDK_VERSION: &str = "minSdkVersion";
}
