#![forbid(unsafe_code)]
//! mailprep_lib: SPF/DKIM/DMARC record checks and inline image embedding
//! for HTML e-mail.

pub mod auth;
pub mod contact;
pub mod embed;
pub mod validator;

pub use validator::{
    AddressValidator, EmailError, NormalizedEmail, SyntaxValidator, ValidationMode,
    ValidationReport, normalize_email, validate_email,
};

pub use auth::{
    AddressClass, AuthError, AuthLookupOptions, AuthRecord, AuthStatus, DkimError, DkimRecord,
    DkimSelectorStatus, DmarcError, DmarcRecord, DmarcStatus, DnsClient, NetworkError,
    RecordType, SpfError, SpfOptions, SpfQuery, SpfRecord, SpfStatus, SpfVerdict,
    check_auth_records, check_auth_records_with_options, check_with_resolver, classify_address,
    is_ip_in_network, parse_dkim_record, parse_dmarc_record, spf_check, spf_check_with_options,
    validate_dkim_record, validate_dmarc_record,
};

pub use contact::Contact;

pub use embed::{
    DefaultFetcher, Disposition, EmbedError, EmbedMode, EmbedOptions, EmbeddedImagePart, Embedder,
    FetchError, Fetcher, InlineParts, MarkerCounts, MimeAssembler, count_markers, embed_images,
    html_to_plain_text,
};
