// Copyright 2026 S4Core Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! XML response generation for the AWS IAM Query protocol.

use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use tgw_features::iam::{AccessKeyLastUsedInfo, AccessKeyMetadata, CreatedAccessKey, User};

/// IAM API XML namespace.
pub const IAM_XMLNS: &str = "https://iam.amazonaws.com/doc/2010-05-08/";

/// Wraps an action result in the `{Action}Response` envelope.
///
/// Actions without output pass `None` and get only `ResponseMetadata`.
pub fn response(action: &str, result: Option<&str>, request_id: &str) -> String {
    let result = match result {
        Some(body) => format!("\n  <{action}Result>{body}\n  </{action}Result>"),
        None => String::new(),
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<{action}Response xmlns="{IAM_XMLNS}">{result}
  <ResponseMetadata>
    <RequestId>{}</RequestId>
  </ResponseMetadata>
</{action}Response>"#,
        escape(request_id)
    )
}

/// `<User>` result body shared by CreateUser and GetUser.
pub fn user_result(user: &User) -> String {
    format!("\n    <User>{}\n    </User>", user_fields(user, 6))
}

/// ListUsers result body.
pub fn list_users_result(users: &[User]) -> String {
    let mut xml = String::from("\n    <Users>");
    for user in users {
        xml.push_str(&format!("\n      <member>{}\n      </member>", user_fields(user, 8)));
    }
    xml.push_str("\n    </Users>\n    <IsTruncated>false</IsTruncated>");
    xml
}

/// CreateAccessKey result body. The only place a secret is ever rendered.
pub fn create_access_key_result(key: &CreatedAccessKey) -> String {
    format!(
        r#"
    <AccessKey>
      <UserName>{}</UserName>
      <AccessKeyId>{}</AccessKeyId>
      <Status>{}</Status>
      <SecretAccessKey>{}</SecretAccessKey>
      <CreateDate>{}</CreateDate>
    </AccessKey>"#,
        escape(&key.username),
        escape(&key.access_key_id),
        key.status,
        escape(&key.secret_access_key),
        format_date(&key.create_date)
    )
}

/// ListAccessKeys result body.
pub fn list_access_keys_result(username: &str, keys: &[AccessKeyMetadata]) -> String {
    let mut xml = format!(
        "\n    <UserName>{}</UserName>\n    <AccessKeyMetadata>",
        escape(username)
    );
    for key in keys {
        xml.push_str(&format!(
            r#"
      <member>
        <UserName>{}</UserName>
        <AccessKeyId>{}</AccessKeyId>
        <Status>{}</Status>
        <CreateDate>{}</CreateDate>
      </member>"#,
            escape(&key.username),
            escape(&key.access_key_id),
            key.status,
            format_date(&key.create_date)
        ));
    }
    xml.push_str("\n    </AccessKeyMetadata>\n    <IsTruncated>false</IsTruncated>");
    xml
}

/// GetAccessKeyLastUsed result body.
///
/// A key that never authenticated reports `N/A` service and region and no
/// `LastUsedDate`, as AWS does.
pub fn access_key_last_used_result(info: &AccessKeyLastUsedInfo) -> String {
    let last_used = match &info.last_used {
        Some(used) => format!(
            r#"
      <LastUsedDate>{}</LastUsedDate>
      <ServiceName>{}</ServiceName>
      <Region>{}</Region>"#,
            format_date(&used.date),
            escape(&used.service_name),
            escape(&used.region)
        ),
        None => "\n      <ServiceName>N/A</ServiceName>\n      <Region>N/A</Region>".to_string(),
    };
    format!(
        "\n    <UserName>{}</UserName>\n    <AccessKeyLastUsed>{}\n    </AccessKeyLastUsed>",
        escape(&info.username),
        last_used
    )
}

/// Generates an IAM `ErrorResponse` document.
///
/// # Arguments
///
/// * `error_type` - `Sender` or `Receiver`
/// * `code` - Error code
/// * `message` - Human-readable message
/// * `request_id` - Request ID for tracing
pub fn error_response(error_type: &str, code: &str, message: &str, request_id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ErrorResponse xmlns="{IAM_XMLNS}">
  <Error>
    <Type>{}</Type>
    <Code>{}</Code>
    <Message>{}</Message>
  </Error>
  <RequestId>{}</RequestId>
</ErrorResponse>"#,
        escape(error_type),
        escape(code),
        escape(message),
        escape(request_id)
    )
}

fn user_fields(user: &User, indent: usize) -> String {
    let pad = " ".repeat(indent);
    format!(
        "\n{pad}<Path>{}</Path>\n{pad}<UserName>{}</UserName>\n{pad}<UserId>{}</UserId>\
         \n{pad}<Arn>{}</Arn>\n{pad}<CreateDate>{}</CreateDate>",
        escape(&user.path),
        escape(&user.username),
        escape(&user.user_id),
        escape(&user.arn),
        format_date(&user.create_date)
    )
}

/// ISO 8601 with second precision, the format IAM uses.
fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
